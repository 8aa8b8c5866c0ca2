pub mod threaded_embedding_backend;
