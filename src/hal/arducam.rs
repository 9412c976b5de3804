// src/hal/arducam.rs
//! ArduCAM capture bus over an `embedded-hal` SPI device

use embedded_hal::spi::{Operation, SpiDevice};
use tracing::debug;

use crate::hal::camera::{CaptureBus, CaptureError};

/// ArduCAM register map
pub mod regs {
    pub const TEST1: u8 = 0x00;
    pub const FIFO_CONTROL: u8 = 0x04;
    pub const FIFO_CLEAR_MASK: u8 = 0x01;
    pub const FIFO_START_MASK: u8 = 0x02;
    pub const TRIGGER: u8 = 0x41;
    pub const CAPTURE_DONE_MASK: u8 = 0x08;
    pub const FIFO_SIZE1: u8 = 0x42;
    pub const FIFO_SIZE2: u8 = 0x43;
    pub const FIFO_SIZE3: u8 = 0x44;
    pub const BURST_FIFO_READ: u8 = 0x3C;
    pub const WRITE_FLAG: u8 = 0x80;
    pub const PROBE_PATTERN: u8 = 0x55;
}

pub struct ArduCamSpiBus<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> ArduCamSpiBus<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    fn write_reg(&mut self, addr: u8, value: u8) -> Result<(), CaptureError> {
        self.spi
            .write(&[addr | regs::WRITE_FLAG, value])
            .map_err(|e| transfer_error("write", e))
    }

    fn read_reg(&mut self, addr: u8) -> Result<u8, CaptureError> {
        let mut buf = [addr & !regs::WRITE_FLAG, 0];
        self.spi
            .transfer_in_place(&mut buf)
            .map_err(|e| transfer_error("read", e))?;
        Ok(buf[1])
    }
}

fn transfer_error<E: embedded_hal::spi::Error>(op: &str, err: E) -> CaptureError {
    CaptureError::Transfer(format!("{} failed: {:?}", op, err.kind()))
}

impl<SPI: SpiDevice + Send> CaptureBus for ArduCamSpiBus<SPI> {
    fn probe(&mut self) -> Result<(), CaptureError> {
        self.write_reg(regs::TEST1, regs::PROBE_PATTERN)?;
        let read = self.read_reg(regs::TEST1)?;
        if read != regs::PROBE_PATTERN {
            return Err(CaptureError::ProbeFailed {
                expected: regs::PROBE_PATTERN,
                read,
            });
        }
        debug!("arducam probe ok");
        Ok(())
    }

    fn begin_capture(&mut self) -> Result<(), CaptureError> {
        // Flushing the FIFO also clears the done flag
        self.write_reg(regs::FIFO_CONTROL, regs::FIFO_CLEAR_MASK)?;
        self.write_reg(regs::FIFO_CONTROL, regs::FIFO_START_MASK)
    }

    fn capture_done(&mut self) -> Result<bool, CaptureError> {
        Ok(self.read_reg(regs::TRIGGER)? & regs::CAPTURE_DONE_MASK != 0)
    }

    fn fifo_length(&mut self) -> Result<u32, CaptureError> {
        let low = self.read_reg(regs::FIFO_SIZE1)? as u32;
        let mid = self.read_reg(regs::FIFO_SIZE2)? as u32;
        let high = (self.read_reg(regs::FIFO_SIZE3)? & 0x7F) as u32;
        Ok((high << 16) | (mid << 8) | low)
    }

    fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), CaptureError> {
        self.spi
            .transaction(&mut [Operation::Write(&[regs::BURST_FIFO_READ]), Operation::Read(buf)])
            .map_err(|e| transfer_error("burst read", e))
    }
}
