// Keymapr CLI
// Standalone daemon: grabs keyboards, runs the trigger detector, dispatches actions

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "daemon")]
use anyhow::Context;
#[cfg(feature = "daemon")]
use clap::Parser;

#[cfg(feature = "daemon")]
use keymapr_core::event::EventLoop;
#[cfg(feature = "daemon")]
use keymapr_core::{
    Action, Config, DeviceOrigin, Effect, TriggerDetector, VirtualKeyboard,
};

/// Trigger-based key remapper for Linux
#[derive(Parser, Debug)]
#[command(name = "keymapr")]
#[command(version = "0.1.0")]
#[command(about = "Trigger-based key remapper", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Manually specify devices to read (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<String>,

    /// Grab the devices so consumed events never reach other applications
    #[arg(short, long)]
    grab: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List available keyboard devices
    #[arg(long)]
    list_devices: bool,
}

/// Main application state
#[cfg(feature = "daemon")]
struct Application {
    config_path: PathBuf,
    config: Config,
    args: Args,
    /// Cleared by SIGINT/SIGTERM to stop the loop
    running: Arc<AtomicBool>,
    /// Set by SIGHUP to request a config reload
    reload: Arc<AtomicBool>,
}

#[cfg(feature = "daemon")]
impl Application {
    fn new(config_path: PathBuf, args: Args) -> anyhow::Result<Self> {
        let config = Config::from_toml_path(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;

        Ok(Self {
            config_path,
            config,
            args,
            running: Arc::new(AtomicBool::new(true)),
            reload: Arc::new(AtomicBool::new(false)),
        })
    }

    fn validate(&self) -> anyhow::Result<()> {
        println!(
            "Configuration is valid: {} keymap(s), long press {}ms, double press {}ms",
            self.config.key_maps.len(),
            self.config.preferences.long_press_delay_ms,
            self.config.preferences.double_press_delay_ms
        );
        Ok(())
    }

    fn list_devices() -> anyhow::Result<()> {
        let devices = EventLoop::list_devices().context("failed to enumerate devices")?;

        println!("Found {} keyboard device(s):", devices.len());
        for device in &devices {
            let origin = match &device.origin {
                DeviceOrigin::Internal => "internal".to_string(),
                DeviceOrigin::External(descriptor) => format!("external {}", descriptor),
            };
            match &device.path {
                Some(path) => println!("  {}: {} ({}) [{}]", device.index, device.name, path, origin),
                None => println!("  {}: {} [{}]", device.index, device.name, origin),
            }
        }
        Ok(())
    }

    fn install_signal_handlers(&self) {
        use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let running = self.running.clone();
        let reload = self.reload.clone();

        std::thread::spawn(move || {
            if let Ok(mut signals) = Signals::new([SIGINT, SIGTERM, SIGHUP]) {
                for signal in &mut signals {
                    match signal {
                        SIGINT | SIGTERM => {
                            log::info!("received signal {}, shutting down", signal);
                            running.store(false, Ordering::SeqCst);
                            break;
                        }
                        SIGHUP => {
                            log::info!("received SIGHUP, scheduling config reload");
                            reload.store(true, Ordering::SeqCst);
                        }
                        _ => {}
                    }
                }
            }
        });
    }

    fn run(&mut self) -> anyhow::Result<()> {
        self.install_signal_handlers();

        let mut detector =
            TriggerDetector::new(&self.config.to_key_maps(), self.config.preferences);

        // Device filter precedence: CLI --devices > config [devices].only.
        let device_filter = if !self.args.devices.is_empty() {
            self.args.devices.clone()
        } else {
            self.config.device_filter.clone()
        };

        let mut event_loop = if self.args.grab {
            EventLoop::new_with_grab(&device_filter)
        } else {
            EventLoop::new(&device_filter)
        }
        .context("failed to open keyboard devices")?;

        log::info!(
            "listening on {} device(s): {:?}",
            event_loop.device_count(),
            event_loop.device_names()
        );
        if !self.args.grab {
            log::warn!("running without --grab; consumed events still reach other applications");
        }

        let mut keyboard = VirtualKeyboard::new().context("failed to create virtual keyboard")?;

        let result = self.run_main_loop(&mut detector, &mut event_loop, &mut keyboard);

        event_loop.ungrab_all();
        result
    }

    fn run_main_loop(
        &mut self,
        detector: &mut TriggerDetector,
        event_loop: &mut EventLoop,
        keyboard: &mut VirtualKeyboard,
    ) -> anyhow::Result<()> {
        println!("keymapr is running. Press Ctrl+C to exit.");

        let clock = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            if self.reload.swap(false, Ordering::SeqCst) {
                self.reload_config(detector);
            }

            // Wake up no later than the next pending long/double-press
            // deadline, and at least every 100ms for signal handling.
            let now = clock.elapsed().as_millis() as u64;
            let timeout = match detector.next_deadline() {
                Some(deadline) => deadline.saturating_sub(now).min(100) as i32,
                None => 100,
            };

            let events = event_loop.poll_events(timeout)?;
            for event in &events {
                let now = clock.elapsed().as_millis() as u64;
                let consumed = detector.on_key_event(event, now);
                log::debug!("{} {} consumed={}", event.key, event.action, consumed);

                // Grab mode swallows everything at the device; unconsumed
                // events must be forwarded or the key is lost.
                if self.args.grab && !consumed {
                    if let Err(e) = keyboard.send_key_action(event.key, event.action) {
                        log::error!("failed to forward {}: {}", event.key, e);
                    }
                }
            }

            detector.check_timeouts(clock.elapsed().as_millis() as u64);

            for effect in detector.drain_effects() {
                self.dispatch_effect(effect, keyboard);
            }
        }

        Ok(())
    }

    fn reload_config(&mut self, detector: &mut TriggerDetector) {
        match Config::from_toml_path(&self.config_path) {
            Ok(config) => {
                detector.set_key_maps(&config.to_key_maps());
                detector.set_preferences(config.preferences);
                self.config = config;
                log::info!(
                    "reloaded {} with {} keymap(s)",
                    self.config_path.display(),
                    self.config.key_maps.len()
                );
            }
            Err(e) => {
                log::error!(
                    "reload of {} failed, keeping previous config: {}",
                    self.config_path.display(),
                    e
                );
            }
        }
    }

    fn dispatch_effect(&self, effect: Effect, keyboard: &mut VirtualKeyboard) {
        match effect {
            Effect::PerformAction(Action::Command { command }) => {
                log::info!("running command: {}", command);
                match std::process::Command::new("sh").arg("-c").arg(&command).spawn() {
                    Ok(mut child) => {
                        std::thread::spawn(move || {
                            let _ = child.wait();
                        });
                    }
                    Err(e) => log::error!("failed to run '{}': {}", command, e),
                }
            }
            Effect::PerformAction(Action::SendKey { key }) => {
                if let Err(e) = keyboard.tap_key(key) {
                    log::error!("failed to tap {}: {}", key, e);
                }
            }
            Effect::PerformAction(Action::Text { text }) => {
                if let Err(e) = keyboard.send_text(&text) {
                    log::error!("failed to type text: {}", e);
                }
            }
            Effect::Vibrate => {
                // No haptics on this platform.
                log::info!("haptic feedback requested");
            }
            Effect::ImitateKey(key) => {
                // Only meaningful when we swallowed the original event.
                if self.args.grab {
                    if let Err(e) = keyboard.tap_key(key) {
                        log::error!("failed to re-send {}: {}", key, e);
                    }
                } else {
                    log::debug!("would re-send {} (not grabbing)", key);
                }
            }
        }
    }
}

#[cfg(feature = "daemon")]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    // list-devices works without a config.
    if args.list_devices {
        return Application::list_devices();
    }

    let config_path = args
        .config
        .clone()
        .context("--config is required when not using --list-devices")?;

    let mut app = Application::new(config_path, args)?;

    if app.args.check_config {
        return app.validate();
    }

    app.run()
}

// Stub for when the daemon feature is not enabled
#[cfg(not(feature = "daemon"))]
fn main() {
    eprintln!("Error: the keymapr binary requires the 'daemon' feature.");
    eprintln!("Please build with: cargo build --release --features daemon --bin keymapr");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(feature = "daemon")]
    fn test_args_parsing() {
        let args = Args::parse_from(["keymapr", "--config", "/tmp/test.toml"]);

        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert!(args.devices.is_empty());
        assert!(!args.grab);
        assert!(!args.verbose);
        assert!(!args.check_config);
        assert!(!args.list_devices);
    }

    #[test]
    #[cfg(feature = "daemon")]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "keymapr",
            "--config",
            "/tmp/test.toml",
            "--grab",
            "--verbose",
            "--devices",
            "/dev/input/event0",
            "--devices",
            "/dev/input/event1",
        ]);

        assert!(args.grab);
        assert!(args.verbose);
        assert_eq!(args.devices.len(), 2);
    }

    #[test]
    #[cfg(feature = "daemon")]
    fn test_args_list_devices() {
        let args = Args::parse_from(["keymapr", "--list-devices"]);
        assert!(args.list_devices);
    }
}
