pub mod binary;
pub mod constants;
pub mod context;
pub mod dispersion;
pub mod params;
pub mod select;
pub mod solar_wind;
pub mod time;
pub mod timing_errors;
pub mod toas;
