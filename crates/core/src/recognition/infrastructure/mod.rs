pub mod in_memory_identity_store;
pub mod onnx_arcface_embedder;
pub mod sqlite_identity_store;
