//! Request / response shapes for the HTTP surface.

pub mod tattoo;
