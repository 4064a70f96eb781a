use std::io::{Read, Seek};

use anyhow::Result;
use serde::Serialize;

use super::command::{InfoArgs, ReportFormat};
use crate::input::{InputKind, InputReader};
use crate::timestamp::time_str;
use sacd::process::disc::{Disc, SectorReader};
use sacd::structs::container::{ContainerKind, DsdStreamInfo};

pub fn cmd_info(args: &InfoArgs) -> Result<()> {
    log::info!("Analyzing input: {}", args.input.display());

    let mut input = InputReader::open(&args.input)?;
    let report = match input.kind() {
        InputKind::SacdImage => {
            let disc = Disc::open(input.into_inner(), args.area.into())?;
            Report::Disc(disc_report(&disc))
        }
        InputKind::Dsf | InputKind::Dff => Report::Container(container_report(input.get_mut())?),
    };

    match args.format {
        ReportFormat::Text => report.print(),
        ReportFormat::Yaml => print!("{}", serde_yaml_ng::to_string(&report)?),
    }

    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Disc(DiscReport),
    Container(ContainerReport),
}

#[derive(Debug, Serialize)]
pub struct DiscReport {
    pub sector_layout: String,
    pub version: String,
    pub hybrid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub has_stereo_area: bool,
    pub has_multichannel_area: bool,
    pub area: AreaReport,
    pub tracks: Vec<TrackReport>,
}

#[derive(Debug, Serialize)]
pub struct AreaReport {
    pub kind: String,
    pub channels: u32,
    pub sample_rate: u32,
    pub frame_format: String,
    pub total_playtime: String,
    pub first_sector: u32,
    pub last_sector: u32,
}

#[derive(Debug, Serialize)]
pub struct TrackReport {
    pub number: usize,
    pub title: String,
    pub performer: String,
    pub start: String,
    pub duration: String,
    pub first_sector: u32,
    pub last_sector: u32,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct ContainerReport {
    pub container: String,
    pub sample_rate: u32,
    pub channels: u32,
    pub bit_order: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size_per_channel: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples_per_channel: Option<u64>,
    pub data_offset: u64,
    pub data_length: u64,
    pub duration: String,
}

pub fn disc_report<R: SectorReader>(disc: &Disc<R>) -> DiscReport {
    let toc = disc.toc();
    let area = disc.area();
    let geometry = disc.geometry();
    let album = disc.album_info();
    let album_name = album.and_then(|a| a.title()).unwrap_or("Unknown album");

    let date = toc.disc_date;
    let tracks = disc
        .tracks()
        .iter()
        .map(|t| TrackReport {
            number: t.number,
            title: t.display_title(album_name),
            performer: t.display_performer().to_string(),
            start: t.start.to_string(),
            duration: t.duration.to_string(),
            first_sector: t.start_sector,
            last_sector: t.end_sector,
            size_bytes: t.end_byte - t.start_byte,
        })
        .collect();

    DiscReport {
        sector_layout: geometry.layout.to_string(),
        version: toc.version.to_string(),
        hybrid: toc.hybrid,
        album_title: album.and_then(|a| a.title()).map(str::to_owned),
        album_artist: album.and_then(|a| a.artist()).map(str::to_owned),
        genre: toc.primary_genre().map(|g| g.to_string()),
        release_date: (date.year != 0).then(|| date.to_string()),
        has_stereo_area: toc.has_two_channel_area(),
        has_multichannel_area: toc.has_multi_channel_area(),
        area: AreaReport {
            kind: geometry.kind.to_string(),
            channels: geometry.channel_count,
            sample_rate: geometry.sample_frequency,
            frame_format: geometry.frame_format.to_string(),
            total_playtime: area.toc.total_playtime.to_string(),
            first_sector: area.toc.track_start,
            last_sector: area.toc.track_end,
        },
        tracks,
    }
}

pub fn container_report<R: Read + Seek>(reader: &mut R) -> Result<ContainerReport> {
    let info = DsdStreamInfo::read(reader)?;

    Ok(ContainerReport {
        container: match info.kind {
            ContainerKind::Dsf => "DSF".to_string(),
            ContainerKind::Dff => "DSDIFF".to_string(),
        },
        sample_rate: info.sample_rate,
        channels: info.channel_count,
        bit_order: if info.lsb_first { "LSB first" } else { "MSB first" }.to_string(),
        block_size_per_channel: (info.block_size_per_channel > 0)
            .then_some(info.block_size_per_channel),
        samples_per_channel: info.sample_count,
        data_offset: info.data_offset,
        data_length: info.data_length,
        duration: time_str(info.duration_secs()),
    })
}

impl Report {
    fn print(&self) {
        match self {
            Report::Disc(disc) => disc.print(),
            Report::Container(container) => container.print(),
        }
    }
}

impl DiscReport {
    fn print(&self) {
        println!();
        println!("SACD Disc Information");
        println!("=====================");
        println!();
        println!("Sector layout               {}", self.sector_layout);
        println!("Format version              {}", self.version);
        println!("Hybrid disc                 {}", yes_no(self.hybrid));
        if let Some(title) = &self.album_title {
            println!("Album                       {title}");
        }
        if let Some(artist) = &self.album_artist {
            println!("Artist                      {artist}");
        }
        if let Some(genre) = &self.genre {
            println!("Genre                       {genre}");
        }
        if let Some(date) = &self.release_date {
            println!("Release date                {date}");
        }
        println!("Stereo area                 {}", yes_no(self.has_stereo_area));
        println!("Multichannel area           {}", yes_no(self.has_multichannel_area));
        println!();

        let area = &self.area;
        println!("Selected Area");
        println!("  Type                      {}", area.kind);
        println!("  Channels                  {}", area.channels);
        println!("  Sample rate               {} Hz", area.sample_rate);
        println!("  Frame format              {}", area.frame_format);
        println!("  Total playtime            {}", area.total_playtime);
        println!("  Audio sectors             {}-{}", area.first_sector, area.last_sector);
        println!();

        println!("Tracks");
        println!(
            "  {:>3}  {:<8}  {:<8}  {:>12}  {}",
            "#", "Start", "Length", "Size", "Title / Performer"
        );
        for t in &self.tracks {
            println!(
                "  {:>3}  {:<8}  {:<8}  {:>12}  {} / {}",
                t.number, t.start, t.duration, t.size_bytes, t.title, t.performer
            );
        }
        println!();
    }
}

impl ContainerReport {
    fn print(&self) {
        println!();
        println!("{} File Information", self.container);
        println!("=====================");
        println!();
        println!("Sample rate                 {} Hz", self.sample_rate);
        println!("Channels                    {}", self.channels);
        println!("Bit order                   {}", self.bit_order);
        if let Some(block) = self.block_size_per_channel {
            println!("Block size per channel      {block} bytes");
        }
        if let Some(samples) = self.samples_per_channel {
            println!("Samples per channel         {samples}");
        }
        println!(
            "Audio data                  {} bytes at offset {}",
            self.data_length, self.data_offset
        );
        println!("Duration                    {}", self.duration);
        println!();
    }
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dff::DffWriter;
    use std::io::Cursor;

    #[test]
    fn test_container_report_for_written_dff() -> Result<()> {
        let mut writer = DffWriter::new(Cursor::new(Vec::new()));
        writer.configure_audio_format(2_822_400, 2, false)?;
        writer.write_header()?;
        writer.write_dsd(&vec![0x69; 705_600])?;
        writer.finish()?;

        let mut cursor = writer.into_inner()?;
        let report = container_report(&mut cursor)?;
        assert_eq!(report.container, "DSDIFF");
        assert_eq!(report.channels, 2);
        assert_eq!(report.bit_order, "MSB first");
        assert_eq!(report.block_size_per_channel, None);
        assert_eq!(report.duration, "00:00:01.000");

        let yaml = serde_yaml_ng::to_string(&Report::Container(report))?;
        assert!(yaml.contains("sample_rate: 2822400"));
        assert!(!yaml.contains("block_size_per_channel"));
        Ok(())
    }
}
