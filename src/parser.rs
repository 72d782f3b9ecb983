/// Text readers for the companion files of a spectral-function run.
pub mod band_conf;
pub mod general;
pub mod poscar;
pub mod sf_table;
