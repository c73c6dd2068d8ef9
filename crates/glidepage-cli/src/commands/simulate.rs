use std::io::{self, Write};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;
use tokio::sync::watch;
use tracing::{debug, info};

use glidepage_core::{
    AppConfig, Environment, InputKind, ScrollPage, SectionId, SectionLayout, Viewport,
};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of frames to run
    #[arg(short = 'n', long, default_value_t = 240)]
    pub frames: u64,
    /// Milliseconds between frames
    #[arg(long, default_value_t = 16.0)]
    pub frame_ms: f64,
    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280.0)]
    pub width: f64,
    /// Viewport height in pixels
    #[arg(long, default_value_t = 800.0)]
    pub height: f64,
    /// Scripted input as FRAME:ACTION[:ARG...], e.g. 0:wheel:120, 30:section:spark
    #[arg(short = 'i', long = "input")]
    pub script: Vec<ScriptStep>,
    /// Print a snapshot after every frame instead of only the last one
    #[arg(long)]
    pub each_frame: bool,
    /// Pace frames against wall time; Ctrl-C stops early
    #[arg(long)]
    pub realtime: bool,
}

/// One scripted input applied before a frame
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    pub frame: u64,
    pub action: ScriptAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptAction {
    Feed(InputKind, f64),
    /// Programmatic seek; `true` skips the animation
    Seek(f64, bool),
    Section(SectionId),
    Lock,
    Unlock,
    /// Report a notified stage as finished
    Finish(SectionId, usize),
}

impl FromStr for ScriptStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let frame = parts[0]
            .parse::<u64>()
            .map_err(|_| format!("invalid frame number in '{}'", s))?;
        let number = |i: usize| -> Result<f64, String> {
            let raw = parts.get(i).ok_or_else(|| format!("missing value in '{}'", s))?;
            raw.parse::<f64>()
                .map_err(|_| format!("invalid number '{}' in '{}'", raw, s))
        };
        let section = |i: usize| -> Result<SectionId, String> {
            let raw = parts.get(i).ok_or_else(|| format!("missing section in '{}'", s))?;
            raw.parse::<SectionId>().map_err(|e| e.to_string())
        };

        let action = match parts.get(1).copied() {
            Some("wheel") => ScriptAction::Feed(InputKind::Wheel, number(2)?),
            Some("touch") => ScriptAction::Feed(InputKind::Touch, number(2)?),
            Some("key") => ScriptAction::Feed(InputKind::Key, number(2)?),
            Some("seek") => ScriptAction::Seek(number(2)?, false),
            Some("jump") => ScriptAction::Seek(number(2)?, true),
            Some("section") => ScriptAction::Section(section(2)?),
            Some("lock") => ScriptAction::Lock,
            Some("unlock") => ScriptAction::Unlock,
            Some("finish") => {
                let stage = parts
                    .get(3)
                    .and_then(|raw| raw.parse::<usize>().ok())
                    .ok_or_else(|| format!("invalid stage index in '{}'", s))?;
                ScriptAction::Finish(section(2)?, stage)
            }
            Some(other) => return Err(format!("unknown action '{}'", other)),
            None => return Err(format!("missing action in '{}'", s)),
        };

        Ok(Self { frame, action })
    }
}

fn apply(page: &mut ScrollPage, step: &ScriptStep) {
    debug!(frame = step.frame, action = ?step.action, "Applying scripted input");
    match &step.action {
        ScriptAction::Feed(kind, delta) => {
            page.feed(*delta, *kind);
        }
        ScriptAction::Seek(offset, immediate) => page.seek_to(*offset, *immediate),
        ScriptAction::Section(id) => {
            page.scroll_to_section(*id, false);
        }
        ScriptAction::Lock => page.lock(),
        ScriptAction::Unlock => page.unlock(),
        ScriptAction::Finish(section, stage) => {
            if let Some(epoch) = page.gate(*section).map(|g| g.epoch()) {
                page.notify_stage_finished(*section, *stage, epoch);
            }
        }
    }
}

pub async fn run(config: &AppConfig, args: SimulateArgs) -> Result<()> {
    if !args.frame_ms.is_finite() || args.frame_ms <= 0.0 {
        return Err(anyhow!("--frame-ms must be positive, got {}", args.frame_ms));
    }

    let viewport = Viewport::new(args.width, args.height);
    let layout = SectionLayout::stacked(viewport.height, &config.ui.section_viewports);
    let env = Environment::with_viewport(viewport);
    let mut page = ScrollPage::mount(config, &env, layout.content_height, 0.0)
        .ok_or_else(|| anyhow!("viewport {}x{} is not usable", args.width, args.height))?;
    for (id, element) in &layout.sections {
        page.register_section(*id, element);
    }

    // Create shutdown channel
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut interval = if args.realtime {
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            let _ = shutdown_tx_clone.send(true);
        });
        Some(tokio::time::interval(Duration::from_secs_f64(
            args.frame_ms / 1000.0,
        )))
    } else {
        None
    };

    info!(
        frames = args.frames,
        steps = args.script.len(),
        content_height = layout.content_height,
        "Simulation started"
    );

    let mut out = io::stdout().lock();
    for frame in 0..=args.frames {
        if let Some(interval) = interval.as_mut() {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown_rx.changed() => {
                    info!(frame, "Simulation interrupted");
                    break;
                }
            }
        }

        for step in args.script.iter().filter(|s| s.frame == frame) {
            apply(&mut page, step);
        }
        page.frame(frame as f64 * args.frame_ms);

        if args.each_frame {
            serde_json::to_writer(&mut out, &page.snapshot())?;
            writeln!(out)?;
        }
    }

    if !args.each_frame {
        serde_json::to_writer_pretty(&mut out, &page.snapshot())?;
        writeln!(out)?;
    }
    out.flush()?;

    page.teardown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feed_steps() {
        let step: ScriptStep = "12:wheel:120".parse().unwrap();
        assert_eq!(step.frame, 12);
        assert_eq!(step.action, ScriptAction::Feed(InputKind::Wheel, 120.0));

        let step: ScriptStep = "0:touch:-30.5".parse().unwrap();
        assert_eq!(step.action, ScriptAction::Feed(InputKind::Touch, -30.5));
    }

    #[test]
    fn test_parse_navigation_steps() {
        assert_eq!(
            "4:jump:1600".parse::<ScriptStep>().unwrap().action,
            ScriptAction::Seek(1600.0, true)
        );
        assert_eq!(
            "30:section:Spark".parse::<ScriptStep>().unwrap().action,
            ScriptAction::Section(SectionId::Spark)
        );
        assert_eq!(
            "90:finish:footer:2".parse::<ScriptStep>().unwrap().action,
            ScriptAction::Finish(SectionId::Footer, 2)
        );
        assert_eq!("7:lock".parse::<ScriptStep>().unwrap().action, ScriptAction::Lock);
    }

    #[test]
    fn test_parse_errors() {
        assert!("x:wheel:1".parse::<ScriptStep>().is_err());
        assert!("1:fling:1".parse::<ScriptStep>().is_err());
        assert!("1:wheel".parse::<ScriptStep>().is_err());
        assert!("1:section:sidebar".parse::<ScriptStep>().is_err());
        assert!("1".parse::<ScriptStep>().is_err());
    }
}
