//! Chunk decoding.
//!
//! Decoding is split into three layers:
//!
//! - [`DecoderRegistry`] maps a directory's compression code to a
//!   [`Decoder`] and a hint whether the codec is worth a worker
//! - [`codecs`] holds the built-in decoders registered by default
//! - [`Pool`] dispatches decode jobs to worker slots, or runs them inline
//!   when it has none
//!
//! Every decoded chunk passes [`apply_predictor`] before it is returned.

pub mod codecs;
mod pool;
mod predictor;
mod registry;
mod worker;

pub use codecs::{
    is_abbreviated_stream, merge_jpeg_tables, unpack_bits, DeflateDecoder, JpegDecoder,
    LzwDecoder, PackBitsDecoder, RawDecoder, WebImageDecoder,
};
pub use pool::{default_pool_size, Pool};
pub use predictor::apply_predictor;
pub use registry::{register_decoder, resolve_decoder, Decoder, DecoderFactory, DecoderRegistry};
pub use worker::{
    serve_requests, ThreadWorkerFactory, WorkerContext, WorkerEndpoint, WorkerFactory,
    WorkerRequest, WorkerResponse,
};
