//! # Array Types
//!
//! This crate defines the fundamental types shared by every layer of the
//! dataset access stack.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: element types and extents are typed values,
//!   never bare integers passed around by convention.
//! - **Immutable metadata**: a dataset's shape and type are read once and
//!   never change while it is open.
//! - **Raw bytes at the edges**: transfers move bytes; typed views are a thin
//!   reinterpretation on top.
//!
//! ## Key Types
//!
//! - [`TypeDescriptor`]: element class and byte width
//! - [`Shape`]: per-dimension extent, rank >= 1
//! - [`Element`]: native numeric types that map onto a [`TypeDescriptor`]

pub mod codec;
pub mod dtype;
pub mod shape;

pub use codec::{decode, encode, CodecError, Element};
pub use dtype::{TypeClass, TypeDescriptor};
pub use shape::{Shape, ShapeError};
