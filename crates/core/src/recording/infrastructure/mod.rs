pub mod json_lines_recorder;
