pub mod ffmpeg_source;
pub mod image_file_source;
pub mod media_source_opener;
