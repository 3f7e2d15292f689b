use thiserror::Error;

/// Why a corner quad cannot be turned into a projective transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Degeneracy {
    #[error("three or more corners are collinear")]
    Collinear,

    #[error("normalizing divisor is zero")]
    VanishingDivisor,

    #[error("matrix has non-finite entries")]
    NonFinite,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DrapeError {
    #[error("degenerate corner geometry: {0}")]
    DegenerateGeometry(Degeneracy),

    #[error("rendering surface does not support 3D transforms")]
    UnsupportedRendering,

    #[error("invalid overlay config: {0}")]
    Config(String),
}
