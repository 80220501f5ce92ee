#![no_std]

pub mod firmware;

pub use firmware::run;
