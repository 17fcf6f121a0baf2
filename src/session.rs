//! Interactive menu session
//!
//! Drives a [`PoolManager`] from line-based input: an object size first
//! (unless configured), then numeric menu choices until exit or end of
//! input. Generic over reader and writer so transcripts can be tested.

use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::pool::{BlockHandle, CycleReport, DeallocOutcome, PoolManager, StatusReport};
use std::io::{BufRead, Write};
use std::str::FromStr;
use tracing::{debug, info};

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const BOLD: &str = "\x1b[1m";

/// One entry of the session menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Allocate,
    DeallocateLast,
    PrintStatus,
    SimulateCycle,
    Exit,
}

impl FromStr for MenuChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(Self::Allocate),
            "2" => Ok(Self::DeallocateLast),
            "3" => Ok(Self::PrintStatus),
            "4" => Ok(Self::SimulateCycle),
            "5" => Ok(Self::Exit),
            other => Err(Error::InvalidArgument(format!(
                "unknown menu choice: {:?}",
                other
            ))),
        }
    }
}

/// Explanation printed after a misuse diagnostic
pub fn error_theory(message: &str) -> String {
    format!(
        "Error Theory: {}\n\
         -------------------------------------------------\n\
         In memory management, errors like this often happen when:\n\
         - Trying to free memory not allocated by the allocator\n\
         - Accessing invalid or already freed memory\n\
         - Using incorrect object size during deallocation\n\
         Such mistakes can cause system crashes, leaks, or instability.",
        message
    )
}

/// Menu-driven simulation over one object size
pub struct Session<R, W> {
    input: R,
    output: W,
    pool: PoolManager,
    /// Handles the user has allocated and not yet given back, newest last
    tracked: Vec<BlockHandle>,
    object_size: Option<usize>,
    color: bool,
    json_status: bool,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(input: R, output: W, config: &SimConfig) -> Self {
        Self {
            input,
            output,
            pool: PoolManager::new(),
            tracked: Vec::new(),
            object_size: config.object_size,
            color: config.color,
            json_status: config.json_status,
        }
    }

    pub fn pool(&self) -> &PoolManager {
        &self.pool
    }

    pub fn tracked(&self) -> &[BlockHandle] {
        &self.tracked
    }

    pub fn object_size(&self) -> Option<usize> {
        self.object_size
    }

    /// Hand back the writer, dropping the pool
    pub fn into_output(self) -> W {
        self.output
    }

    /// Run until the user exits or input ends
    pub fn run(&mut self) -> Result<()> {
        let size = match self.object_size {
            Some(size) => size,
            None => self.prompt_size()?,
        };
        self.object_size = Some(size);
        info!(size, "Slab allocator session started");

        loop {
            self.print_menu()?;
            let Some(line) = self.read_line()? else {
                debug!("Input closed");
                self.exit()?;
                return Ok(());
            };

            match line.parse::<MenuChoice>() {
                Ok(MenuChoice::Exit) => {
                    self.exit()?;
                    return Ok(());
                }
                Ok(choice) => {
                    debug!(?choice, "Menu choice");
                    self.dispatch(choice, size)?;
                }
                Err(_) => {
                    let msg = self.paint(RED, "Invalid choice. Please try again.");
                    writeln!(self.output, "{}", msg)?;
                    self.print_theory("Invalid menu choice entered")?;
                }
            }
        }
    }

    /// Execute one menu choice against the pool
    pub fn dispatch(&mut self, choice: MenuChoice, size: usize) -> Result<()> {
        match choice {
            MenuChoice::Allocate => self.allocate(size),
            MenuChoice::DeallocateLast => self.deallocate_last(size),
            MenuChoice::PrintStatus => self.print_status(size),
            MenuChoice::SimulateCycle => self.simulate_cycle(size),
            MenuChoice::Exit => self.exit(),
        }
    }

    fn prompt_size(&mut self) -> Result<usize> {
        let prompt = self.paint(GREEN, "Enter object size for the slab allocator (in bytes): ");
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let line = self
            .read_line()?
            .ok_or_else(|| Error::InvalidArgument("no object size provided".to_string()))?;
        match line.trim().parse::<usize>() {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(Error::InvalidArgument(format!(
                "object size must be a positive number of bytes, got {:?}",
                line.trim()
            ))),
        }
    }

    fn print_menu(&mut self) -> Result<()> {
        let title = format!(
            "{}{}",
            self.paint_raw(BOLD),
            self.paint(BLUE, "Slab Allocator Simulation Menu")
        );
        writeln!(self.output)?;
        writeln!(self.output, "{}", title)?;
        writeln!(self.output, "=================================")?;
        writeln!(self.output, "1. Allocate Object")?;
        writeln!(self.output, "2. Deallocate Last Allocated Object")?;
        writeln!(self.output, "3. Print Slab Status")?;
        writeln!(self.output, "4. Simulate One Allocation + Deallocation Cycle")?;
        writeln!(self.output, "5. Exit")?;
        write!(self.output, "Enter your choice: ")?;
        self.output.flush()?;
        Ok(())
    }

    fn allocate(&mut self, size: usize) -> Result<()> {
        let handle = self.pool.allocate(size);
        self.tracked.push(handle);
        let msg = self.paint(GREEN, &format!("Object allocated at address: {}", handle));
        writeln!(self.output, "{}", msg)?;
        Ok(())
    }

    fn deallocate_last(&mut self, size: usize) -> Result<()> {
        let Some(handle) = self.tracked.pop() else {
            let msg = self.paint(YELLOW, "No objects to deallocate.");
            writeln!(self.output, "{}", msg)?;
            return self.print_theory("Deallocation attempted with no active objects");
        };

        let outcome = self.pool.deallocate(handle, size);
        self.report_outcome(handle, outcome)?;
        // Misuse outcomes already printed their diagnostic; confirm real frees only
        if outcome.is_freed() {
            let msg = self.paint(GREEN, &format!("Object deallocated at address: {}", handle));
            writeln!(self.output, "{}", msg)?;
        }
        Ok(())
    }

    fn print_status(&mut self, size: usize) -> Result<()> {
        let report = self.pool.status(size);
        self.write_status(report)
    }

    fn simulate_cycle(&mut self, size: usize) -> Result<()> {
        let header = self.paint(BLUE, "Simulating Kernel Memory Operation (1 Cycle)...");
        writeln!(self.output)?;
        writeln!(self.output, "{}", header)?;
        writeln!(self.output, "-------------------------------------------------")?;

        let CycleReport {
            allocated,
            deallocated,
            status,
        } = self.pool.simulate_one_cycle(size, &mut self.tracked);

        let lines = [
            self.paint(GREEN, "Allocating memory..."),
            self.paint(GREEN, &format!("Allocated at address: {}", allocated)),
        ];
        for line in lines {
            writeln!(self.output, "{}", line)?;
        }

        if let Some((handle, outcome)) = deallocated {
            writeln!(self.output)?;
            let msg = self.paint(RED, "Deallocating memory...");
            writeln!(self.output, "{}", msg)?;
            self.report_outcome(handle, outcome)?;
            let msg = self.paint(RED, &format!("Deallocated address: {}", handle));
            writeln!(self.output, "{}", msg)?;
        }

        self.write_status(status)
    }

    fn exit(&mut self) -> Result<()> {
        let msg = self.paint(BLUE, "Exiting. Thank you!");
        writeln!(self.output, "{}", msg)?;
        self.output.flush()?;
        Ok(())
    }

    /// Print the diagnostic for a deallocation that did not free cleanly
    fn report_outcome(&mut self, handle: BlockHandle, outcome: DeallocOutcome) -> Result<()> {
        match outcome {
            DeallocOutcome::Freed => Ok(()),
            DeallocOutcome::NoSuchSlab => {
                let msg = self.paint(
                    RED,
                    "Error: Attempting to deallocate from a non-existent slab.",
                );
                writeln!(self.output, "{}", msg)?;
                self.print_theory("Deallocation from a size class with no slab")
            }
            DeallocOutcome::Unmanaged { .. } => {
                let msg = self.paint(
                    YELLOW,
                    &format!(
                        "Warning: Attempted to deallocate unmanaged object at address: {}",
                        handle
                    ),
                );
                writeln!(self.output, "{}", msg)?;
                self.print_theory("Deallocation of an object this slab does not manage")
            }
        }
    }

    fn write_status(&mut self, report: StatusReport) -> Result<()> {
        match report {
            StatusReport::NoSlab { .. } => {
                let msg = self.paint(BLUE, &report.to_string());
                writeln!(self.output, "{}", msg)?;
            }
            StatusReport::Slab { .. } => {
                writeln!(self.output)?;
                let text = report.to_string();
                let (heading, body) = text.split_once('\n').unwrap_or((text.as_str(), ""));
                let heading = format!(
                    "{}{}{}",
                    self.paint_raw(BOLD),
                    heading,
                    self.paint_raw(RESET)
                );
                writeln!(self.output, "{}", heading)?;
                writeln!(self.output, "{}", body)?;
            }
        }

        if self.json_status {
            let json = serde_json::to_string(&report)
                .map_err(|e| Error::Serialization(e.to_string()))?;
            writeln!(self.output, "{}", json)?;
        }
        Ok(())
    }

    fn print_theory(&mut self, message: &str) -> Result<()> {
        let theory = error_theory(message);
        let (heading, body) = theory.split_once('\n').unwrap_or((theory.as_str(), ""));
        let heading = self.paint(RED, heading);
        writeln!(self.output)?;
        writeln!(self.output, "{}", heading)?;
        writeln!(self.output, "{}", body)?;
        Ok(())
    }

    /// Next input line, or `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", color, text, RESET)
        } else {
            text.to_string()
        }
    }

    fn paint_raw(&self, code: &'static str) -> &'static str {
        if self.color {
            code
        } else {
            ""
        }
    }
}
