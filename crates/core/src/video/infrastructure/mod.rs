pub mod face_snapshot_writer;
pub mod image_sequence_source;
