use std::io::{self, Stderr, Write};

use crossterm::{
    cursor::MoveToPreviousLine,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use tokio::sync::watch;

use crate::{
    error::AppError,
    model::{
        snapshot::{BatchSnapshot, ItemSnapshot},
        TransferState,
    },
};

mod statusline;

pub use statusline::format_bytes;

/// Redraws the batch in place on stderr.
pub struct TerminalView {
    rendered_lines: u16,
    writer: Stderr,
}

impl Default for TerminalView {
    fn default() -> Self {
        Self {
            rendered_lines: 0,
            writer: io::stderr(),
        }
    }
}

impl TerminalView {
    pub fn render(&mut self, snapshot: &BatchSnapshot) -> Result<(), AppError> {
        let lines = lines(snapshot);

        if self.rendered_lines > 0 {
            queue!(self.writer, MoveToPreviousLine(self.rendered_lines))?;
        }

        for line in &lines {
            queue!(
                self.writer,
                Clear(ClearType::CurrentLine),
                Print(line),
                Print("\r\n")
            )?;
        }

        self.writer.flush()?;
        self.rendered_lines = lines.len() as u16;

        Ok(())
    }
}

/// Renders every snapshot change until the coordinator goes away.
pub async fn run(mut receiver: watch::Receiver<BatchSnapshot>) -> Result<(), AppError> {
    let mut view = TerminalView::default();
    while receiver.changed().await.is_ok() {
        let snapshot = receiver.borrow_and_update().clone();
        view.render(&snapshot)?;
    }
    Ok(())
}

pub fn lines(snapshot: &BatchSnapshot) -> Vec<String> {
    let mut lines: Vec<_> = snapshot.items.iter().map(item_line).collect();
    lines.extend(statusline::lines(snapshot));
    lines
}

fn item_line(item: &ItemSnapshot) -> String {
    let marker = match item.state {
        None | Some(TransferState::Pending) => "·".to_owned(),
        Some(TransferState::Uploading) => format!("{:>3}%", item.progress),
        Some(TransferState::Success) => "✓".to_owned(),
        Some(TransferState::Error) => "✗".to_owned(),
        Some(TransferState::Cancelled) => "VOID".to_owned(),
    };

    format!("{:>4} {} {}", marker, item.relative_path, format_bytes(item.size))
}

#[cfg(test)]
mod test {
    use crate::model::BatchStatus;

    use super::*;

    fn item(index: usize, state: Option<TransferState>, progress: u8) -> ItemSnapshot {
        ItemSnapshot {
            index,
            progress,
            relative_path: format!("docs/{}.txt", index),
            size: 2048,
            state,
        }
    }

    #[test]
    fn item_lines_show_state_markers() {
        assert_eq!("   · docs/0.txt 2 KB", item_line(&item(0, None, 0)));
        assert_eq!(
            " 42% docs/1.txt 2 KB",
            item_line(&item(1, Some(TransferState::Uploading), 42))
        );
        assert_eq!(
            "   ✓ docs/2.txt 2 KB",
            item_line(&item(2, Some(TransferState::Success), 100))
        );
        assert_eq!(
            "VOID docs/3.txt 2 KB",
            item_line(&item(3, Some(TransferState::Cancelled), 30))
        );
        assert_eq!(
            "   ✗ docs/4.txt 2 KB",
            item_line(&item(4, Some(TransferState::Error), 30))
        );
    }

    #[test]
    fn single_item_has_no_overall_line() {
        let snapshot = BatchSnapshot {
            items: vec![item(0, Some(TransferState::Uploading), 10)],
            progress: 10,
            status: BatchStatus::Running,
        };

        assert_eq!(1, lines(&snapshot).len());
    }
}
