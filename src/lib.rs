// src/lib.rs

pub mod config;
pub mod energy;
pub mod error;
pub mod hamiltonian;
pub mod io;
pub mod lattice;
pub mod observables;
pub mod rng;
pub mod sim;
pub mod spin_field;
pub mod vec3;
