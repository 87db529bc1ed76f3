// Demo mode: drive the view with a scripted session instead of stdin
//
// Walks a pending selection around downtown St. Cloud, tries the device
// location, submits one report, and prints status along the way. Against a
// live backend the submitted sighting shows up as the latest overlay on the
// immediate re-poll; without one, the poll warnings show stale retention.
//
// Run with: SIGHTING_DEMO=1 cargo run --release

use crate::console::Command;
use crate::geo::Coordinate;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Feed the demo sequence into the view, then quit
pub async fn run_demo(tx: mpsc::Sender<Command>) {
    // Let the first poll land before the first click
    sleep(Duration::from_millis(1500)).await;

    for (command, delay_ms) in demo_sequence() {
        println!("> {}", describe(&command));
        if tx.send(command).await.is_err() {
            // View already torn down
            return;
        }
        sleep(Duration::from_millis(delay_ms)).await;
    }

    let _ = tx.send(Command::Quit).await;
}

fn describe(command: &Command) -> String {
    match command {
        Command::Click(p) => format!("click {:.4} {:.4}", p.lat(), p.lng()),
        Command::Locate => "locate".to_string(),
        Command::Submit(Some(d)) => format!("submit {}", d),
        Command::Submit(None) => "submit".to_string(),
        Command::Status => "status".to_string(),
        Command::Help => "help".to_string(),
        Command::Quit => "quit".to_string(),
    }
}

/// Commands with the pause that follows each (ms)
fn demo_sequence() -> Vec<(Command, u64)> {
    let mut sequence = vec![(Command::Status, 800)];

    // Clicks converge on the river crossing; the selection pair moves, never multiplies
    let clicks = [
        (45.5612, -94.1701),
        (45.5598, -94.1655),
        (45.5581, -94.1618),
    ];
    for (lat, lng) in clicks {
        if let Ok(p) = Coordinate::new(lat, lng) {
            sequence.push((Command::Click(p), 700));
        }
    }

    sequence.extend([
        (Command::Status, 800),
        (Command::Locate, 1000),
        (Command::Status, 800),
        (
            Command::Submit(Some("Red cape over the Mississippi".to_string())),
            2000,
        ),
        (Command::Status, 1000),
    ]);

    sequence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_sequence_submits_after_selecting() {
        let sequence = demo_sequence();
        let first_click = sequence
            .iter()
            .position(|(c, _)| matches!(c, Command::Click(_)))
            .unwrap();
        let submit = sequence
            .iter()
            .position(|(c, _)| matches!(c, Command::Submit(_)))
            .unwrap();
        assert!(first_click < submit);
        assert!(!sequence.iter().any(|(c, _)| *c == Command::Quit));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_demo_ends_with_quit() {
        let (tx, mut rx) = mpsc::channel(32);
        tokio::spawn(run_demo(tx));

        let mut last = None;
        while let Some(command) = rx.recv().await {
            last = Some(command);
        }
        assert_eq!(last, Some(Command::Quit));
    }
}
