//! Minimal host: monitor the keyboard and print frame snapshots.
//!
//! On Windows this captures real input through the low-level hook plus
//! the polling worker. Requires an interactive session.

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use ayame_core::hook::WindowsBackend;
    use ayame_core::{InputEngine, MonitorConfig};
    use std::collections::HashMap;
    use std::sync::Arc;

    tracing_subscriber::fmt::init();

    let mut remaps = HashMap::new();
    remaps.insert("CapsLock".to_string(), vec!["LControl".to_string()]);

    let mut engine = InputEngine::new(Arc::new(WindowsBackend));
    engine.set_config(MonitorConfig {
        remaps,
        enable_remapper: true,
        ..MonitorConfig::default()
    })?;

    let rx = engine.frames();
    std::thread::spawn(move || {
        for frame in rx {
            println!(
                "frame {:>6}  pressed {:?}  held {:?}  released {:?}",
                frame.frame_number, frame.just_pressed, frame.held, frame.just_released
            );
        }
    });

    engine.start_with_hook()?;
    println!("Monitoring keyboard. CapsLock acts as LControl. Ctrl+C to quit.");
    ayame_core::hook::run_message_loop();

    engine.stop();
    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("This example needs the Windows input backend.");
}
