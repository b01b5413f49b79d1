use suboverlay::config::{is_supported_file, Appearance, PersistedState};
use suboverlay::control::{ControlMessage, Controller, Response};
use suboverlay::entry::EntrySet;
use suboverlay::error::OverlayError;
use suboverlay::overlay::Overlay;
use suboverlay::platform::SimulatedPlayer;
use suboverlay::render::{RenderTarget, Surface};

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Args, Parser as ClapParser, Subcommand};
use log::LevelFilter;

/// Upper bound on the ticks a single `play` run may simulate.
const MAX_TICKS: u64 = 1_000_000;

fn main() {
    let cli = Cli::parse();
    setup_logger(cli.verbose);

    match run(cli) {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Overlay timed subtitles on a playing video")]
struct Cli {
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity. May be repeated."
    )]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play a subtitle file against a simulated player and print every change
    /// of the overlay.
    Play(PlayArgs),
    /// Drive an overlay with commands and JSON control messages, one per line.
    Control(ControlArgs),
}

#[derive(Args)]
struct PlayArgs {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "The subtitle file to play. If not supplied, the subtitles will be read from standard input.",
        default_value = "-"
    )]
    input: String,
    #[arg(
        long,
        value_name = "SECONDS",
        allow_hyphen_values = true,
        help = "Shift every subtitle by this many seconds.",
        default_value_t = 0.0
    )]
    offset: f64,
    #[arg(long, value_name = "PX", help = "Subtitle font size in pixels.")]
    font_size: Option<u32>,
    #[arg(long, value_name = "HEX", help = "Subtitle color, as #rgb or #rrggbb.")]
    font_color: Option<String>,
    #[arg(
        long,
        value_name = "SECONDS",
        help = "Playback tick interval.",
        default_value_t = 0.25
    )]
    step: f64,
    #[arg(
        long,
        value_name = "SECONDS",
        help = "Length of the simulated video. Defaults to one second past the last subtitle."
    )]
    duration: Option<f64>,
    #[arg(
        long,
        value_name = "FILE",
        help = "Prime the overlay with a saved state document."
    )]
    state: Option<PathBuf>,
    #[arg(long, help = "Print the overlay as HTML instead of plain text.")]
    html: bool,
}

#[derive(Args)]
struct ControlArgs {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "The file to read commands from. If not supplied, commands will be read from standard input.",
        default_value = "-"
    )]
    input: String,
    #[arg(
        long,
        value_name = "FILE",
        help = "State document to prime every overlay with; updated on exit."
    )]
    state: Option<PathBuf>,
    #[arg(long, help = "Print the overlay as HTML instead of plain text.")]
    html: bool,
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Play(args) => play(args),
        Command::Control(args) => control(args),
    }
}

fn setup_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

/// Writes every presented surface to a terminal stream. The first write
/// failure is kept for the caller and stops all further output.
struct Terminal {
    out: Box<dyn Write>,
    html: bool,
    error: Option<io::Error>,
}

impl Terminal {
    fn new(out: Box<dyn Write>, html: bool) -> Self {
        Self {
            out,
            html,
            error: None,
        }
    }

    fn stdout(html: bool) -> Self {
        Self::new(Box::new(io::stdout()), html)
    }

    fn stderr(html: bool) -> Self {
        Self::new(Box::new(io::stderr()), html)
    }

    fn write(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = writeln!(self.out, "{}", text).and_then(|()| self.out.flush()) {
            self.error = Some(err);
        }
    }

    /// Fail with the first write error seen, if any.
    fn check(&mut self) -> Result<()> {
        match self.error.take() {
            Some(err) => Err(err).context("Failed to write overlay output"),
            None => Ok(()),
        }
    }
}

impl RenderTarget for Terminal {
    fn present(&mut self, surface: &Surface) {
        let drawn = if self.html {
            surface.to_html()
        } else {
            surface.to_string()
        };
        self.write(&drawn);
    }

    fn clear(&mut self) {
        self.write("[overlay removed]");
    }
}

fn read_subtitles(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        return Ok(buffer);
    }
    if !is_supported_file(input) {
        return Err(OverlayError::UnsupportedFile(input.to_string()).into());
    }
    std::fs::read_to_string(input).context(format!("Failed to open subtitle file: '{}'", input))
}

fn load_state(path: Option<&Path>) -> Result<PersistedState> {
    match path {
        Some(path) => PersistedState::load(path)
            .context(format!("Failed to load state: '{}'", path.display())),
        None => Ok(PersistedState::default()),
    }
}

fn play(args: PlayArgs) -> Result<()> {
    playback_ticks(0.0, args.step)?;
    let subtitles = read_subtitles(&args.input)?;
    let state = load_state(args.state.as_deref())?;

    let mut overlay = Overlay::create(SimulatedPlayer::new(), Terminal::stdout(args.html));
    overlay.prime(&state);

    let count = overlay
        .handle(ControlMessage::LoadSubtitles { subtitles })
        .count
        .unwrap_or(0);
    if count == 0 {
        return Err(anyhow!("No subtitles found in '{}'.", args.input));
    }
    log::info!("Playing {} subtitles from '{}'", count, args.input);

    if args.offset != 0.0 {
        let response = overlay.handle(ControlMessage::SetOffset {
            offset: args.offset,
        });
        if response.success != Some(true) {
            bail!("Invalid offset: {}", args.offset);
        }
    }

    if args.font_size.is_some() || args.font_color.is_some() {
        let current = overlay.appearance().clone();
        let response = overlay.handle(ControlMessage::SetAppearance {
            font_size: args.font_size.unwrap_or(current.font_size_px),
            font_color: args.font_color.unwrap_or(current.font_color),
        });
        if response.success != Some(true) {
            bail!("Invalid font size or color.");
        }
    }

    let duration = args
        .duration
        .unwrap_or_else(|| default_duration(overlay.engine().entries()));
    let ticks = playback_ticks(duration, args.step)?;

    overlay.platform_mut().load(Some(duration));
    for tick in 0..=ticks {
        let position = (tick as f64 * args.step).min(duration);
        overlay.platform_mut().seek(position);
        overlay.tick();
        overlay.target_mut().check()?;
    }
    overlay.cleanup();
    overlay.target_mut().check()?;

    Ok(())
}

/// One second past the end of the last subtitle.
fn default_duration(entries: &EntrySet) -> f64 {
    entries
        .iter()
        .map(|entry| entry.end_time)
        .fold(0.0, f64::max)
        + 1.0
}

/// Number of ticks needed to play `duration` seconds in steps of `step`.
fn playback_ticks(duration: f64, step: f64) -> Result<u64> {
    if !step.is_finite() || step <= 0.0 {
        bail!("The tick interval must be a positive number, got {}", step);
    }
    if !duration.is_finite() || duration < 0.0 {
        bail!("The video duration must be a non-negative number, got {}", duration);
    }
    let ticks = (duration / step).ceil();
    if ticks > MAX_TICKS as f64 {
        bail!(
            "Playing {} seconds in steps of {} seconds takes {} ticks, more than the limit of {}. Use a larger --step or a shorter --duration.",
            duration,
            step,
            ticks,
            MAX_TICKS
        );
    }
    Ok(ticks as u64)
}

fn control(args: ControlArgs) -> Result<()> {
    let input: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&args.input)
            .context(format!("Failed to open command file: '{}'", args.input))?;
        Box::new(BufReader::new(file))
    };
    let mut state = load_state(args.state.as_deref())?;
    let mut controller: Controller<SimulatedPlayer, Terminal> = Controller::new();

    for (n, line) in input.lines().enumerate() {
        let line = line.context("Failed to read command")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        execute(line, &mut controller, &mut state, args.html)
            .context(format!("Failed to execute command on line {}", n + 1))?;
        if let Some(overlay) = controller.overlay_mut() {
            overlay.target_mut().check()?;
        }
    }

    if controller.pending() > 0 {
        log::warn!(
            "{} control messages were never answered; no overlay was attached",
            controller.pending()
        );
    }
    if let Some(mut overlay) = controller.cleanup() {
        overlay.target_mut().check()?;
    }

    if let Some(path) = &args.state {
        state
            .save(path)
            .context(format!("Failed to save state: '{}'", path.display()))?;
    }
    Ok(())
}

fn execute(
    line: &str,
    controller: &mut Controller<SimulatedPlayer, Terminal>,
    state: &mut PersistedState,
    html: bool,
) -> Result<()> {
    let mut words = line.split_whitespace();
    let responses = match words.next() {
        Some("attach") => {
            let duration = words
                .next()
                .map(|d| d.parse::<f64>())
                .transpose()
                .context("Invalid video duration")?;
            let mut player = SimulatedPlayer::new();
            player.load(duration);
            let mut overlay = Overlay::create(player, Terminal::stderr(html));
            overlay.prime(state);
            controller.attach(overlay)
        }
        Some("tick") => {
            let position = words
                .next()
                .ok_or_else(|| anyhow!("Missing playback position"))?
                .parse::<f64>()
                .context("Invalid playback position")?;
            if let Some(overlay) = controller.overlay_mut() {
                overlay.platform_mut().seek(position);
            }
            controller.tick();
            Vec::new()
        }
        Some("cleanup") => {
            if let Some(mut overlay) = controller.cleanup() {
                overlay.target_mut().check()?;
            }
            Vec::new()
        }
        Some("load") => {
            let path = words.next().ok_or_else(|| anyhow!("Missing subtitle file"))?;
            let subtitles = read_subtitles(path)?;
            let responses = submit(ControlMessage::LoadSubtitles { subtitles }, controller, state);
            state.subtitle_filename = Some(path.to_string());
            responses
        }
        _ => {
            let message = ControlMessage::from_json(line)?;
            submit(message, controller, state)
        }
    };

    let mut stdout = io::stdout();
    for response in responses {
        if let Some(count) = response.count {
            state.subtitle_count = Some(count);
        }
        writeln!(stdout, "{}", response.to_json()?).context("Failed to write response")?;
    }
    stdout.flush().context("Failed to write response")?;
    Ok(())
}

/// Record what the message changes in the persisted state, then hand it to
/// the controller.
fn submit(
    message: ControlMessage,
    controller: &mut Controller<SimulatedPlayer, Terminal>,
    state: &mut PersistedState,
) -> Vec<Response> {
    match &message {
        ControlMessage::LoadSubtitles { subtitles } => {
            state.subtitles = Some(subtitles.clone());
            state.subtitle_filename = None;
            state.subtitle_count = None;
        }
        ControlMessage::SetAppearance {
            font_size,
            font_color,
        } => {
            if let Some(appearance) = Appearance::new(*font_size, font_color) {
                state.set_appearance(&appearance);
            }
        }
        _ => (),
    }
    controller.submit(message).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use suboverlay::parser::Parser;

    use std::cell::Cell;
    use std::rc::Rc;

    struct BrokenPipe {
        attempts: Rc<Cell<usize>>,
    }

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            self.attempts.set(self.attempts.get() + 1);
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn broken_terminal() -> (Terminal, Rc<Cell<usize>>) {
        let attempts = Rc::new(Cell::new(0));
        let out = BrokenPipe {
            attempts: Rc::clone(&attempts),
        };
        (Terminal::new(Box::new(out), false), attempts)
    }

    macro_rules! test_playback_ticks {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (duration, step, expected): (f64, f64, Option<u64>) = $value;

                assert_eq!(playback_ticks(duration, step).ok(), expected);
            }
        )*
        }
    }

    test_playback_ticks! {
        test_ticks_exact: (10.0, 0.25, Some(40)),
        test_ticks_rounds_up: (1.1, 0.5, Some(3)),
        test_ticks_zero_duration: (0.0, 0.25, Some(0)),
        test_ticks_at_limit: (250_000.0, 0.25, Some(MAX_TICKS)),
        test_ticks_over_limit: (250_000.5, 0.25, None),
        test_ticks_infinite_duration: (f64::INFINITY, 0.25, None),
        test_ticks_nan_duration: (f64::NAN, 0.25, None),
        test_ticks_negative_duration: (-1.0, 0.25, None),
        test_ticks_zero_step: (10.0, 0.0, None),
        test_ticks_tiny_step: (10.0, 1e-300, None),
        test_ticks_infinite_step: (10.0, f64::INFINITY, None),
    }

    #[test]
    fn test_huge_timestamp_is_refused() {
        let entries = Parser::new().parse(
            "1\n00:00:01,000 --> 00:00:02,000\nFirst\n\n2\n9999999:00:00,000 --> 9999999:00:01,000\nMuch later\n",
        );
        let duration = default_duration(&entries);

        assert_eq!(duration, 9_999_999.0 * 3600.0 + 2.0);
        assert!(playback_ticks(duration, 0.25).is_err());
    }

    #[test]
    fn test_default_duration() {
        let entries = Parser::new().parse("1\n00:00:05,000 --> 00:00:02,000\nA\n\n2\n00:00:03,000 --> 00:00:04,500\nB");

        assert_eq!(default_duration(&entries), 5.5);
        assert_eq!(default_duration(&EntrySet::new()), 1.0);
    }

    #[test]
    fn test_terminal_keeps_first_write_error() {
        let (mut terminal, attempts) = broken_terminal();

        terminal.present(&Surface::Placeholder);
        terminal.present(&Surface::Placeholder);
        terminal.clear();

        assert_eq!(attempts.get(), 1);
        let err = terminal.check().unwrap_err();
        let cause = err.downcast_ref::<io::Error>().unwrap();
        assert_eq!(cause.kind(), io::ErrorKind::BrokenPipe);
        assert!(terminal.check().is_ok());
    }

    #[test]
    fn test_overlay_reports_closed_output() {
        let mut player = SimulatedPlayer::new();
        player.load(Some(10.0));
        let (terminal, attempts) = broken_terminal();

        let mut overlay = Overlay::create(player, terminal);
        overlay.platform_mut().seek(1.0);
        overlay.tick();

        assert_eq!(attempts.get(), 1);
        assert!(overlay.target_mut().check().is_err());
    }
}
