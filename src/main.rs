//! Sky Bounce headless runner
//!
//! Plays a seeded session with a scripted autoplayer and logs what happens.
//!
//! Usage: `sky-bounce [seed] [tuning.json]`

use std::error::Error;

use sky_bounce::Tuning;
use sky_bounce::sim::{GameEvent, PlayerState, PresentationSink, Rating, Session, TickInput};

/// Simulated run length
const RUN_SECONDS: f64 = 30.0;
/// Host frame length (a 60 Hz display)
const FRAME_MS: f64 = 1000.0 / 60.0;

/// Logs every event and keeps a tally of ratings
#[derive(Default)]
struct LogSink {
    perfect: u32,
    normal: u32,
    failed: u32,
    kills: u32,
}

impl PresentationSink for LogSink {
    fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Rating { rating, streak } => {
                match rating {
                    Rating::Perfect => self.perfect += 1,
                    Rating::Normal => self.normal += 1,
                    Rating::Failed => self.failed += 1,
                }
                log::info!("{} (streak {streak})", rating.as_str());
            }
            GameEvent::Kill { .. } => {
                self.kills += 1;
                log::debug!("{event:?}");
            }
            GameEvent::Death { .. } | GameEvent::NewRecord { .. } => log::info!("{event:?}"),
            _ => log::debug!("{event:?}"),
        }
    }
}

/// Fast-fall on the way down, let go once the perfect window opens, and
/// ask for bullet time near the top of big jumps
fn autoplay(session: &Session) -> TickInput {
    let state = session.state();
    let player = &state.player;
    let hold = match &player.state {
        PlayerState::Idle => true,
        PlayerState::Airborne(_) => player.vy >= 0.0,
        PlayerState::Charging(charge) => !charge.in_perfect_window(),
    };
    TickInput {
        hold,
        bullet_time: player.is_ascending() && player.vy > -400.0,
        ..Default::default()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(arg) => arg.parse::<u64>()?,
        None => 0x5EED,
    };
    let tuning = match args.next() {
        Some(path) => Tuning::from_json(&std::fs::read_to_string(path)?)?,
        None => Tuning::default(),
    };
    log::debug!("Tuning: {}", tuning.to_json()?);

    log::info!("Sky Bounce (native, headless) starting...");
    let mut session = Session::new(tuning, seed);
    let mut sink = LogSink::default();

    let frames = (RUN_SECONDS * 1000.0 / FRAME_MS) as u32;
    let mut idle_frames = 0;
    for _ in 0..frames {
        if session.is_game_over() {
            log::info!("Restarting");
            session.reset();
        }
        let input = autoplay(&session);
        let steps = session.frame(FRAME_MS, &input, &mut sink);
        log::trace!("{steps} steps, alpha {:.2}", session.alpha());

        // Release the hold now and then so a settled player can hop again
        if matches!(session.state().player.state, PlayerState::Idle) {
            idle_frames += 1;
            if idle_frames % 2 == 0 {
                session.frame(FRAME_MS, &TickInput::default(), &mut sink);
            }
        }
    }

    log::info!(
        "Done: record {:.0}px, {} perfect / {} normal / {} failed, {} kills",
        session.record_height(),
        sink.perfect,
        sink.normal,
        sink.failed,
        sink.kills
    );
    Ok(())
}
