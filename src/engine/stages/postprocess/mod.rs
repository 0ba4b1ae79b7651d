pub mod bloom;
pub mod gamma;
pub mod hdr_eye_adaptation;
