//! An ambient particle field. Particles drift, spring back to where they spawned, gather around
//! the pointer and are joined by faint lines when they're close. It runs as a plugin: the host
//! tells us about the terminal and the pointer, and we send back frames of pixels to composite
//! behind the terminal's content.

pub mod cli_args;
pub mod config;
pub mod field;
pub mod particle;
pub mod pointer;
pub mod renderer;
pub mod run;
pub mod surface;
