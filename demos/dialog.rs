//! Dialog demo: a greeting window over a bordered screen.
//!
//! Draws two windows from several threads at once, asks for a name with a
//! blocking read, then greets the user through the format writer.
//!
//! Logs go to `termbus-dialog.log`; set `RUST_LOG=termbus=trace` to see
//! every command the dispatcher executes.

use std::fs::File;
use std::sync::Mutex;
use std::thread;
use termbus::{Color, CursorVisibility, Position, Session, Size, TerminalBackend};

fn configure_logging() -> std::io::Result<()> {
    let file = File::create("termbus-dialog.log")?;
    // The terminal belongs to the session; logging to it would garble the screen.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    configure_logging()?;

    let session = Session::init(TerminalBackend::stdout())?;
    if session.capabilities().has_colors {
        session.start_color()?;
        session.add_color_pair("bw", Color::GREEN, Color::BLACK)?;
        session.add_color_pair("wb", Color::WHITE, Color::BLUE)?;
    }
    session.set_cursor(CursorVisibility::Hidden)?;

    let root = session.root().clone();
    root.set_auto_refresh(true);
    if session.capabilities().has_colors {
        root.set_background("std")?;
    }
    root.border()?;

    let dialog = session.new_window("dialog", Position::new(5, 20), Size::new(5, 40))?;
    dialog.set_auto_refresh(true);
    if session.capabilities().has_colors {
        dialog.set_background("wb")?;
    }
    dialog.border()?;

    // Both windows are drawn from their own threads; the bus keeps each
    // thread's commands in order.
    let footer = {
        let root = root.clone();
        thread::spawn(move || -> termbus::Result<()> {
            let rows = root.max_yx()?.height;
            root.move_to(rows.saturating_sub(3), 19)?;
            root.write_str(" => Type your name and press Enter <=")?;
            Ok(())
        })
    };
    let greeting = {
        let dialog = dialog.clone();
        thread::spawn(move || -> termbus::Result<()> {
            dialog.move_to(1, 3)?;
            dialog.write_str("Hello from Rust\u{2122}!")?;
            dialog.move_to(2, 3)?;
            dialog.format_writer().print("Your *name*: ")?;
            Ok(())
        })
    };
    footer.join().map_err(|_| "footer thread panicked")??;
    greeting.join().map_err(|_| "greeting thread panicked")??;

    dialog.set_auto_cursor(true);
    dialog.set_auto_echo(true);
    let name = dialog.read_line()?;

    dialog.erase()?;
    dialog.border()?;
    dialog.move_to(2, 3)?;
    let mut writer = dialog.format_writer();
    writer.print(&format!("Nice to meet you, ~{name}~!"))?;
    root.move_to(root.max_yx()?.height.saturating_sub(3), 19)?;
    root.write_str(" =>    Press any key to exit     <=")?;
    root.get_char()?;

    session.end()?;
    println!("Goodbye, {name}.");
    Ok(())
}
