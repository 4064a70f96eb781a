//! Data structures representing Scarlet Book and DSD container components.
//!
//! Contains the on-disc TOC records (master TOC, area TOC, master text and
//! the per-track tables), the descriptors found at the start of every audio
//! sector, time codes, and the DSF/DFF headers used for file input.

pub mod album_info;
pub mod area_toc;
pub mod audio_sector;
pub mod container;
pub mod master_toc;
pub mod scarlet_book;
pub mod track_info;
pub mod track_time;
