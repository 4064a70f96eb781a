/// Disc session: geometry probe, TOC loading and track sector access.
///
/// Provides [`Disc`](disc::Disc) over any [`SectorReader`](disc::SectorReader)
/// and the [`AreaGeometry`](disc::AreaGeometry) that configures the audio
/// pipeline for the selected area.
pub mod disc;

/// Audio sector demultiplexing.
///
/// Provides [`split_sector`](demux::split_sector) for walking the packet
/// layout of one sector and the [`Demultiplexer`](demux::Demultiplexer) that
/// routes audio packets to the reassembler or the transcoder.
pub mod demux;

/// DST frame reassembly and decoding.
///
/// Provides the [`DstReassembler`](reassemble::DstReassembler), the
/// [`DstDecompressor`](reassemble::DstDecompressor) seam for an external DST
/// decoder and the [`DstPipeline`](reassemble::DstPipeline) chaining both
/// into a transcoder.
pub mod reassemble;

/// DSD byte layout conversion to native or DoP output.
pub mod transcode;
