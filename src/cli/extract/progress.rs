use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{bar:40.cyan/blue} {pos}/{len} {prefix} ({percent}%)\n{msg} | elapsed: {elapsed_precise}";

pub fn create_progress_bar(multi: &MultiProgress, total: u64, unit: &str) -> Result<ProgressBar> {
    let pb = multi.add(ProgressBar::new(total));
    pb.set_style(ProgressStyle::with_template(&format!(
        "{BAR_TEMPLATE} | ETA: {{eta_precise}}"
    ))?);
    pb.set_prefix(unit.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("opening input");
    Ok(pb)
}

/// Drops the ETA from the bar and prints the final speed line.
pub fn finalize_progress_bar(
    pb: &Option<ProgressBar>,
    audio_duration_secs: f64,
    start_time: std::time::Instant,
) {
    if let Some(pb) = pb {
        let elapsed = start_time.elapsed().as_secs_f64();
        let realtime_multiplier = if elapsed > 0.0 {
            audio_duration_secs / elapsed
        } else {
            0.0
        };
        let final_time_str = crate::timestamp::time_str(audio_duration_secs);

        pb.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.finish_with_message(format!(
            "speed: {realtime_multiplier:.1}x | timestamp: {final_time_str}"
        ));
    }
}
