use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid route request: {0}")]
    InvalidRequest(String),
    #[error("no route bound to session")]
    NoRouteBound,
    #[error("session is closed")]
    SessionClosed,
    #[error("no prediction available")]
    PredictionUnavailable,
    #[error("end of route")]
    EndOfRoute,
    #[error("routing engine error: {0}")]
    Engine(String),
}
