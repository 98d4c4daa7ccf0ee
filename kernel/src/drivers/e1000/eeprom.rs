//! EEPROM reads through the EEPROM Read register (EERD)
//!
//! Software writes a word address together with START, then polls until the
//! device sets DONE and places the word in the upper half of the register.
//! Where those bits sit differs between chips; see [`EepromLayout`].

use super::mac::MacAddress;
use super::register::Register;
use super::variant::EepromLayout;
use super::E1000Error;

/// Polls of EERD before a read is given up on
const POLL_LIMIT: u32 = 10_000_000;

pub struct Eeprom {
    register: Register,
    layout: EepromLayout,
}

impl Eeprom {
    pub fn new(register: Register, layout: EepromLayout) -> Self {
        Eeprom { register, layout }
    }

    pub fn read_word(&mut self, word: u8) -> Result<u16, E1000Error> {
        let request = (u32::from(word) << self.layout.address_shift) | self.layout.start;
        self.register.set(request, !0);
        self.register.confirm();

        for _ in 0..POLL_LIMIT {
            let value = self.register.read_direct();
            if value & self.layout.done != 0 {
                return Ok((value >> self.layout.data_shift) as u16);
            }
            core::hint::spin_loop();
        }
        Err(E1000Error::EepromTimeout { word })
    }

    /// The station address lives in words 0 to 2
    pub fn read_mac_address(&mut self) -> Result<MacAddress, E1000Error> {
        Ok(MacAddress::from_words([
            self.read_word(0)?,
            self.read_word(1)?,
            self.read_word(2)?,
        ]))
    }
}
