//! Drive electronics and control loop for a two-axis orbit globe.
//!
//! One axis sweeps the argument of latitude (AoV) and the other turns the
//! orbital plane about the polar axis (EQX). Angles come either from a manual
//! Keplerian orbit or from a satellite's mean elements.

pub mod actuator;
pub mod bus;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod kernel;
pub mod persist;
pub mod propagate;
pub mod session;
