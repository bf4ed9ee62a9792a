pub mod anchor;
pub mod area_scanner;
pub mod geometry;
pub mod hsl;
pub mod lightness_map;
pub mod pixel;
pub mod ray_scanner;
pub mod region;
pub mod screenshot;
