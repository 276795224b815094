//! Pixel transforms behind a single gateway contract.
//!
//! [`gateway::TransformGateway`] runs an optional primary strategy (usually
//! [`external::ExternalStrategy`]) and retries once with [`raster::RasterStrategy`], validating
//! that whatever comes back is a decodable image.

mod blur;
/// Hex colors.
pub mod color;
mod composite;
/// External-process transform routine.
pub mod external;
/// Strategy trait, gateway and output validation.
pub mod gateway;
/// Radius, unit, shadow and border parameters.
pub mod params;
/// In-process rasterizer.
pub mod raster;
