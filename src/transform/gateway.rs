use crate::foundation::config::RounderConfig;
use crate::foundation::error::{RounderError, RounderResult};
use crate::transform::external::ExternalStrategy;
use crate::transform::params::TransformParams;
use crate::transform::raster::RasterStrategy;

/// One way of producing transformed image bytes.
pub trait TransformStrategy: Send + Sync {
    /// Short name recorded in outcomes and logs.
    fn name(&self) -> &'static str;

    /// Transform `input` (encoded image bytes) into encoded PNG bytes.
    fn apply(&self, input: &[u8], params: &TransformParams) -> RounderResult<Vec<u8>>;
}

/// Result of a successful gateway call.
#[derive(Clone, Debug)]
pub struct GatewayOutput {
    /// Validated PNG bytes.
    pub bytes: Vec<u8>,
    /// Name of the strategy that produced `bytes`.
    pub strategy: &'static str,
    /// `true` when a configured primary strategy failed and the fallback produced the output.
    pub degraded: bool,
}

/// Primary strategy with an automatic single retry through an always-available fallback.
pub struct TransformGateway {
    primary: Option<Box<dyn TransformStrategy>>,
    fallback: Box<dyn TransformStrategy>,
}

impl TransformGateway {
    /// Build a gateway from explicit strategies.
    pub fn new(
        primary: Option<Box<dyn TransformStrategy>>,
        fallback: Box<dyn TransformStrategy>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Gateway that only runs the in-process rasterizer.
    pub fn in_process() -> Self {
        Self::new(None, Box::new(RasterStrategy))
    }

    /// External routine from `cfg.external` (if any), falling back to the rasterizer.
    pub fn from_config(cfg: &RounderConfig) -> Self {
        let primary = cfg.external.as_ref().map(|cmd| {
            Box::new(ExternalStrategy::new(cmd.clone(), cfg.transform_timeout()))
                as Box<dyn TransformStrategy>
        });
        Self::new(primary, Box::new(RasterStrategy))
    }

    /// Name of the primary strategy, if one is configured.
    pub fn primary_name(&self) -> Option<&'static str> {
        self.primary.as_ref().map(|p| p.name())
    }

    /// Transform `input`, retrying once with the fallback when the primary fails.
    #[tracing::instrument(level = "debug", skip_all, fields(params = %params))]
    pub fn apply(&self, input: &[u8], params: &TransformParams) -> RounderResult<GatewayOutput> {
        params.validate()?;

        if let Some(primary) = &self.primary {
            match primary
                .apply(input, params)
                .and_then(validate_output)
            {
                Ok(bytes) => {
                    return Ok(GatewayOutput {
                        bytes,
                        strategy: primary.name(),
                        degraded: false,
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        strategy = primary.name(),
                        fallback = self.fallback.name(),
                        error = %err,
                        "primary transform failed; retrying in-process"
                    );
                }
            }
        }

        let bytes = self.fallback.apply(input, params).and_then(validate_output)?;
        Ok(GatewayOutput {
            bytes,
            strategy: self.fallback.name(),
            degraded: self.primary.is_some(),
        })
    }
}

impl std::fmt::Debug for TransformGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformGateway")
            .field("primary", &self.primary_name())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

/// Reject empty or undecodable transform output.
pub fn validate_output(bytes: Vec<u8>) -> RounderResult<Vec<u8>> {
    if bytes.is_empty() {
        return Err(RounderError::output_invalid("transform returned no bytes"));
    }
    image::load_from_memory(&bytes)
        .map_err(|e| RounderError::output_invalid(format!("output is not a decodable image: {e}")))?;
    Ok(bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/transform/gateway.rs"]
mod tests;
