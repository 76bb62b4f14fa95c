//! Local controller operations
//!
//! A [`Controller`] combines the HCI channel and the management channel of one local adapter.
//! Scanning and pairing are long running operations, only one of them can be in progress at a
//! time. Advertising is independent of both.

use crate::commands::{le, link_control, COMMAND_TIMEOUT};
use crate::discovery::{DiscoveredDevice, Discovery};
use crate::management::{self, ControllerInfo, IoCapability, PairDevice, SetPowered, UnpairDevice};
use bt_exchange_channel::{Error, Result, SynchronousChannel, Transport};
use bt_exchange_core::{Address, AddressType};
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bits of the busy state of a [`Controller`]
pub mod busy {
    pub const IDLE: u32 = 0;
    pub const SCANNING: u32 = 1 << 0;
    pub const PAIRING: u32 = 1 << 1;
    pub const ADVERTISING: u32 = 1 << 2;
    pub const ABORT: u32 = 1 << 3;

    /// The operations that exclude each other
    pub const ACTION_MASK: u32 = SCANNING | PAIRING;
}

/// The default time to wait for pairing to complete
pub const PAIR_TIMEOUT: Duration = Duration::from_secs(20);

/// The general inquiry access code
pub const GIAC: u32 = 0x9E8B33;

/// Classic inquiry
///
/// The inquiry of a BR/EDR controller is done by the operating system, not through the channel.
pub trait Inquiry: Send + Sync {
    /// Inquire for devices for `duration`, returning the address of every device that responded
    fn inquiry(&self, duration: Duration, lap: u32, flags: u32) -> Result<Vec<Address>>;
}

/// A local Bluetooth controller
pub struct Controller<H, M> {
    hci: Arc<SynchronousChannel<H>>,
    management: Arc<SynchronousChannel<M>>,
    index: u16,
    inquiry: Option<Box<dyn Inquiry>>,
    state: Mutex<u32>,
    changed: Condvar,
    /// Held for a whole change of the advertising state
    advertising: Mutex<()>,
    command_timeout: Duration,
    pair_timeout: Duration,
}

impl<H, M> Controller<H, M>
where
    H: Transport,
    M: Transport,
{
    /// Create a new `Controller`
    ///
    /// `index` is the index of the controller used by the management interface.
    pub fn new(hci: Arc<SynchronousChannel<H>>, management: Arc<SynchronousChannel<M>>, index: u16) -> Self {
        Controller {
            hci,
            management,
            index,
            inquiry: None,
            state: Mutex::new(busy::IDLE),
            changed: Condvar::new(),
            advertising: Mutex::new(()),
            command_timeout: COMMAND_TIMEOUT,
            pair_timeout: PAIR_TIMEOUT,
        }
    }

    /// Set the implementation of classic inquiry
    pub fn with_inquiry<I: Inquiry + 'static>(mut self, inquiry: I) -> Self {
        self.inquiry = Some(Box::new(inquiry));
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_pair_timeout(mut self, timeout: Duration) -> Self {
        self.pair_timeout = timeout;
        self
    }

    pub fn hci(&self) -> &Arc<SynchronousChannel<H>> {
        &self.hci
    }

    pub fn management(&self) -> &Arc<SynchronousChannel<M>> {
        &self.management
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    /// Get the busy state
    ///
    /// This is a combination of the bits within [`busy`].
    pub fn state(&self) -> u32 {
        *self.state.lock()
    }

    pub fn is_scanning(&self) -> bool {
        self.state() & busy::SCANNING != 0
    }

    pub fn is_advertising(&self) -> bool {
        self.state() & busy::ADVERTISING != 0
    }

    /// Set the receiver of devices discovered by LE scanning
    pub fn set_discovery<D>(&self, sink: D)
    where
        D: DiscoveredDevice + 'static,
    {
        self.hci.set_unsolicited(Discovery::new(sink));
    }

    /// Read the information of the controller
    pub fn info(&self) -> Result<ControllerInfo> {
        management::read_info(&self.management, self.command_timeout, self.index)
    }

    pub fn power(&self, on: bool) -> Result<()> {
        log::info!("powering {} controller {}", if on { "on" } else { "off" }, self.index);

        management::send_management(&self.management, self.command_timeout, self.index, SetPowered(on)).map(|_| ())
    }

    /// Classic scan
    ///
    /// Every device found by the inquiry is reported once. The number of reported devices is
    /// returned.
    pub fn scan<R>(&self, duration: Duration, lap: u32, flags: u32, mut report: R) -> Result<usize>
    where
        R: FnMut(Address),
    {
        let inquiry = self.inquiry.as_ref().ok_or(Error::Unavailable)?;

        self.begin(busy::SCANNING)?;

        log::info!("classic scan for {:?}", duration);

        let result = inquiry.inquiry(duration, lap, flags).map(|found| {
            let mut seen = HashSet::new();

            for address in found {
                if self.state() & busy::ABORT != 0 {
                    break;
                }

                if seen.insert(address) {
                    report(address);
                }
            }

            seen.len()
        });

        self.end(busy::SCANNING);

        result
    }

    /// LE scan
    ///
    /// Scanning is enabled for `duration` or until [`abort`] is called. Discovered devices are
    /// given to the receiver set with [`set_discovery`].
    ///
    /// [`abort`]: Controller::abort
    /// [`set_discovery`]: Controller::set_discovery
    pub fn scan_le(&self, duration: Duration, parameters: &le::ScanParameters) -> Result<()> {
        self.begin(busy::SCANNING)?;

        log::info!("LE scan for {:?}", duration);

        let result = self.run_le_scan(duration, parameters);

        self.end(busy::SCANNING);

        result
    }

    fn run_le_scan(&self, duration: Duration, parameters: &le::ScanParameters) -> Result<()> {
        le::set_scan_parameters::send(&self.hci, self.command_timeout, parameters)?;

        le::set_scan_enable::send(&self.hci, self.command_timeout, true, parameters.filter_duplicates)?;

        let deadline = Instant::now() + duration;

        let mut state = self.state.lock();

        while *state & busy::ABORT == 0 {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }

        if *state & busy::ABORT != 0 {
            log::info!("LE scan aborted");
        }

        drop(state);

        le::set_scan_enable::send(&self.hci, self.command_timeout, false, parameters.filter_duplicates)
    }

    /// Abort scanning
    ///
    /// This does nothing if the controller is not scanning.
    pub fn abort(&self) {
        let mut state = self.state.lock();

        if *state & busy::SCANNING != 0 {
            *state |= busy::ABORT;

            self.changed.notify_all();
        }
    }

    /// Enable or disable advertising
    ///
    /// `mode` is the advertising type. Nothing is sent to the controller if it already is in the
    /// requested advertising state. Concurrent calls are serialized.
    pub fn advertising(&self, enable: bool, mode: u8) -> Result<()> {
        let _transition = self.advertising.lock();

        if self.is_advertising() == enable {
            return Ok(());
        }

        if enable {
            let parameters = le::AdvertisingParameters {
                advertising_type: mode,
                ..Default::default()
            };

            le::set_advertising_parameters::send(&self.hci, self.command_timeout, &parameters)?;
        }

        le::set_advertising_enable::send(&self.hci, self.command_timeout, enable)?;

        let mut state = self.state.lock();

        if enable {
            *state |= busy::ADVERTISING;
        } else {
            *state &= !busy::ADVERTISING;
        }

        Ok(())
    }

    /// Pair with a remote device
    pub fn pair(&self, address: Address, address_type: AddressType, io_capability: IoCapability) -> Result<()> {
        self.begin(busy::PAIRING)?;

        log::info!("pairing with {} ({})", address, address_type);

        let parameter = PairDevice {
            address,
            address_type,
            io_capability,
        };

        let result = management::send_management(&self.management, self.pair_timeout, self.index, parameter);

        self.end(busy::PAIRING);

        result.map(|_| ())
    }

    /// Remove the pairing of a remote device, disconnecting it if connected
    pub fn unpair(&self, address: Address, address_type: AddressType) -> Result<()> {
        log::info!("unpairing {} ({})", address, address_type);

        let parameter = UnpairDevice {
            address,
            address_type,
            disconnect: true,
        };

        management::send_management(&self.management, self.command_timeout, self.index, parameter).map(|_| ())
    }

    /// Request the name of a remote BR/EDR device
    pub fn remote_name(&self, address: Address) -> Result<String> {
        link_control::remote_name_request::send(&self.hci, self.command_timeout, address)
    }

    fn begin(&self, action: u32) -> Result<()> {
        let mut state = self.state.lock();

        if *state & busy::ACTION_MASK != 0 {
            log::warn!("controller {} is busy ({:#x})", self.index, *state);

            return Err(Error::InProgress);
        }

        *state |= action;

        Ok(())
    }

    fn end(&self, action: u32) {
        let mut state = self.state.lock();

        *state &= !(action | busy::ABORT);

        self.changed.notify_all();
    }
}
