pub mod bicrystal;
pub mod coincidence;
pub mod gb;
