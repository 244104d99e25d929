use std::io::{self, BufRead, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};

pub const QUIT_COMMAND: &str = "q";

enum Message {
    Line(Vec<u8>),
    Closed,
}

/// Console input fed line by line from another thread.
///
/// Reads block until a line arrives. Once the feed is closed (or every
/// `ConsoleFeed` is dropped) the input reports end of file, which lets a
/// signal handler end a pending prompt.
pub struct ConsoleInput {
    rx: Receiver<Message>,
    pending: Vec<u8>,
    pos: usize,
    closed: bool,
}

/// Sending half of a `ConsoleInput`
#[derive(Clone)]
pub struct ConsoleFeed {
    tx: Sender<Message>,
}

impl ConsoleInput {
    pub fn channel() -> (ConsoleInput, ConsoleFeed) {
        let (tx, rx) = mpsc::channel();
        let input = ConsoleInput {
            rx,
            pending: Vec::new(),
            pos: 0,
            closed: false,
        };
        (input, ConsoleFeed { tx })
    }

    /// Block until the feed closes, discarding any lines.
    pub fn wait_closed(&mut self) {
        while !self.closed {
            match self.rx.recv() {
                Ok(Message::Line(_)) => {}
                Ok(Message::Closed) | Err(_) => self.closed = true,
            }
        }
        self.pending.clear();
        self.pos = 0;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Read for ConsoleInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for ConsoleInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.pos >= self.pending.len() && !self.closed {
            match self.rx.recv() {
                Ok(Message::Line(line)) => {
                    self.pending = line;
                    self.pos = 0;
                }
                Ok(Message::Closed) | Err(_) => self.closed = true,
            }
        }
        Ok(&self.pending[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.pending.len());
    }
}

impl ConsoleFeed {
    /// Forward one chunk of input. Returns false once the input is gone.
    pub fn send_line(&self, line: Vec<u8>) -> bool {
        self.tx.send(Message::Line(line)).is_ok()
    }

    /// Make the input report end of file after what was already sent.
    pub fn close(&self) {
        self.tx.send(Message::Closed).ok();
    }
}

/// Forward `reader` to `feed` line by line until it ends, then close the feed.
pub fn forward_lines<R: BufRead>(mut reader: R, feed: ConsoleFeed) {
    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if !feed.send_line(line) {
                    return;
                }
            }
            Err(e) => {
                log::warn!("Console read failed: {}", e);
                break;
            }
        }
    }
    feed.close();
}

/// Why the console loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitReason {
    /// Operator entered the quit command
    Command,
    /// Input stream closed
    EndOfInput,
}

/// Block until the operator enters `q` (or input closes).
///
/// Every other line re-prints the banner and prompt.
pub fn wait_for_quit<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<QuitReason> {
    let mut line = Vec::new();
    loop {
        writeln!(output)?;
        writeln!(output, "STREAMING STARTED")?;
        writeln!(output)?;
        write!(output, "q+enter to stop streaming eye data. ")?;
        output.flush()?;

        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            writeln!(output)?;
            return Ok(QuitReason::EndOfInput);
        }
        let text = String::from_utf8_lossy(&line);
        if text.trim() == QUIT_COMMAND {
            return Ok(QuitReason::Command);
        }
        log::debug!("Ignoring console input {:?}", text.trim());
    }
}

/// Print the termination notice.
pub fn announce_termination<W: Write>(mut output: W) -> io::Result<()> {
    writeln!(output, "Terminating... ")?;
    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_quit_on_q() {
        let mut out = Vec::new();
        let reason = wait_for_quit(Cursor::new("q\n"), &mut out).unwrap();
        assert_eq!(reason, QuitReason::Command);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "\nSTREAMING STARTED\n\nq+enter to stop streaming eye data. ");
    }

    #[test]
    fn test_other_input_repeats_prompt() {
        let mut out = Vec::new();
        let reason = wait_for_quit(Cursor::new("x\nquit\n q \r\n"), &mut out).unwrap();
        assert_eq!(reason, QuitReason::Command);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("STREAMING STARTED").count(), 3);
    }

    #[test]
    fn test_invalid_utf8_line_is_ignored() {
        let mut out = Vec::new();
        let reason = wait_for_quit(Cursor::new(&b"\xff\xfe\nq\n"[..]), &mut out).unwrap();
        assert_eq!(reason, QuitReason::Command);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("STREAMING STARTED").count(), 2);
    }

    #[test]
    fn test_forwarded_lines_reach_quit_loop() {
        let (input, feed) = ConsoleInput::channel();
        let forwarder =
            std::thread::spawn(move || forward_lines(Cursor::new("x\nq\nleftover\n"), feed));

        let reason = wait_for_quit(input, Vec::new()).unwrap();
        assert_eq!(reason, QuitReason::Command);
        forwarder.join().unwrap();
    }

    #[test]
    fn test_closing_feed_ends_pending_read() {
        let (input, feed) = ConsoleInput::channel();
        let closer = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            feed.close();
        });

        let reason = wait_for_quit(input, Vec::new()).unwrap();
        assert_eq!(reason, QuitReason::EndOfInput);
        closer.join().unwrap();
    }

    #[test]
    fn test_close_keeps_earlier_lines_and_drops_later_ones() {
        let (mut input, feed) = ConsoleInput::channel();
        assert!(feed.send_line(b"ab\n".to_vec()));
        feed.close();
        feed.send_line(b"late\n".to_vec());

        let mut line = String::new();
        assert_eq!(input.read_line(&mut line).unwrap(), 3);
        assert_eq!(line, "ab\n");
        line.clear();
        assert_eq!(input.read_line(&mut line).unwrap(), 0);
        assert!(input.is_closed());
    }

    #[test]
    fn test_wait_closed_discards_lines() {
        let (mut input, feed) = ConsoleInput::channel();
        feed.send_line(b"q\n".to_vec());
        feed.close();
        input.wait_closed();
        assert!(input.is_closed());

        let mut buf = [0u8; 4];
        assert_eq!(input.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_end_of_input() {
        let reason = wait_for_quit(Cursor::new("x\n"), Vec::new()).unwrap();
        assert_eq!(reason, QuitReason::EndOfInput);
    }

    #[test]
    fn test_announce_termination() {
        let mut out = Vec::new();
        announce_termination(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Terminating... \n");
    }
}
