//! Onda DSP - multi-rate filter primitives for software-defined radio
//!
//! This crate provides the single-sample building blocks that the onda
//! receiver assembles into demodulation cascades: FIR and IIR filters over
//! circular state buffers, a commutated decimator, a polyphase
//! interpolator, and the magnitude/decibel helpers used by the
//! signal-level feedback loops.
//!
//! # Core Abstractions
//!
//! ## Filters
//!
//! - [`FirFilter`] - Single-sample FIR convolution over a circular buffer
//! - [`FirFilterQ15`] - The same filter in saturating Q15 fixed point
//! - [`IirFilter`] - Direct-Form I IIR (FIR numerator + recursive ring)
//!
//! ## Rate changers
//!
//! - [`Decimator`] / [`DecimatorQ15`] - Commutated M:1 decimation at the
//!   decimated rate
//! - [`Interpolator`] - Polyphase 1:L interpolation at the input rate
//!
//! ## Level measurement
//!
//! - [`DbfsCalculator`] - Magnitude to dBFS via a scaled-log lookup table
//! - [`magnitude_estimate`] / [`magnitude_estimate_i8`] - Robertson's
//!   max + min/2 approximation of sqrt(I^2 + Q^2)
//!
//! # Design Principles
//!
//! - **Real-time safe**: no allocation after construction; every filter
//!   runs sample-at-a-time over preallocated rings
//! - **Total once built**: constructors validate tap counts, factors, and
//!   word lengths; the processing methods never fail
//! - **no_std compatible**: pure `core` plus `libm` for math

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod dbfs;
pub mod decimator;
pub mod error;
pub mod fir;
pub mod fir_q15;
pub mod iir;
pub mod interpolator;
pub mod magnitude;

pub use dbfs::DbfsCalculator;
pub use decimator::{Decimator, DecimatorQ15};
pub use error::DspError;
pub use fir::FirFilter;
pub use fir_q15::FirFilterQ15;
pub use iir::IirFilter;
pub use interpolator::Interpolator;
pub use magnitude::{magnitude_estimate, magnitude_estimate_i8};
