//! Transport boundary: text messages carrying frames, and a lossy relay
//!
//! A message is a comma-separated list of `key:value` pairs naming the receiver and carrying the
//! bits of a frame as `'0'`/`'1'` characters, e.g.
//! `receiver_host:127.0.0.1,receiver_port:9999,data:0110`. Sockets are left to the caller; the
//! relay only decides whether a message survives the hop, and how long the hop takes.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::{bitframe, Bit, Error};

/// Probability with which the relay drops a message by default
pub const DEFAULT_DROP_PROBABILITY: f64 = 0.001;

/// Height of a geostationary orbit (km)
pub const GEOSTATIONARY_ORBIT_HEIGHT_KM: f64 = 35_786.0;

/// On-board processing delay of the relay (ms)
pub const PROCESSING_DELAY_MS: f64 = 5.0;

/// Speed of light (km/s)
const SPEED_OF_LIGHT_KM_PER_S: f64 = 299_792.0;

/// Message sent through the relay
#[derive(Clone, Eq, Hash, PartialEq, Debug)]
pub struct TransportMessage {
    /// Host name or address of the receiver
    pub receiver_host: String,
    /// Port of the receiver
    pub receiver_port: u16,
    /// Bits of the frame
    pub data: Vec<Bit>,
}

impl fmt::Display for TransportMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "receiver_host:{},receiver_port:{},data:{}",
            self.receiver_host,
            self.receiver_port,
            bitframe::bits_to_text(&self.data)
        )
    }
}

impl FromStr for TransportMessage {
    type Err = Error;

    /// Parses a message. Keys may appear in any order; unknown keys are ignored.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut receiver_host = None;
        let mut receiver_port = None;
        let mut data = None;
        for pair in text.trim().split(',') {
            let (key, value) = pair.split_once(':').ok_or_else(|| {
                Error::InvalidInput(format!("Malformed key:value pair {pair:?}"))
            })?;
            match key.trim() {
                "receiver_host" => receiver_host = Some(value.trim().to_string()),
                "receiver_port" => {
                    receiver_port = Some(value.trim().parse::<u16>().map_err(|e| {
                        Error::InvalidInput(format!("Invalid receiver port {value:?}: {e}"))
                    })?);
                }
                "data" => data = Some(bitframe::bits_from_text(value.trim())?),
                _ => {}
            }
        }
        Ok(Self {
            receiver_host: receiver_host.ok_or_else(|| missing_key("receiver_host"))?,
            receiver_port: receiver_port.ok_or_else(|| missing_key("receiver_port"))?,
            data: data.ok_or_else(|| missing_key("data"))?,
        })
    }
}

/// Orbiting relay that forwards items unchanged, except that each is lost with a fixed
/// probability
#[derive(Clone, PartialEq, Debug, Copy)]
pub struct Relay {
    /// Probability that an item is dropped
    drop_probability: f64,
    /// Orbit height (km)
    orbit_height_km: f64,
}

impl Default for Relay {
    fn default() -> Self {
        Self {
            drop_probability: DEFAULT_DROP_PROBABILITY,
            orbit_height_km: GEOSTATIONARY_ORBIT_HEIGHT_KM,
        }
    }
}

impl Relay {
    /// Returns relay in geostationary orbit dropping items with given probability.
    ///
    /// # Errors
    ///
    /// Returns an error if `drop_probability` is not in `[0, 1]`.
    pub fn new(drop_probability: f64) -> Result<Self, Error> {
        if !(0.0 ..= 1.0).contains(&drop_probability) {
            return Err(Error::InvalidInput(format!(
                "Drop probability must be in the range [0, 1] (found {drop_probability})"
            )));
        }
        Ok(Self {
            drop_probability,
            ..Self::default()
        })
    }

    /// Returns the same relay at given orbit height (km).
    ///
    /// # Errors
    ///
    /// Returns an error if `orbit_height_km` is negative or not finite.
    pub fn with_orbit_height(self, orbit_height_km: f64) -> Result<Self, Error> {
        if !orbit_height_km.is_finite() || orbit_height_km < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Orbit height must be a non-negative number of kilometres (found {orbit_height_km})"
            )));
        }
        Ok(Self {
            orbit_height_km,
            ..self
        })
    }

    /// Returns probability that an item is dropped.
    #[must_use]
    pub fn drop_probability(&self) -> f64 {
        self.drop_probability
    }

    /// Returns orbit height (km).
    #[must_use]
    pub fn orbit_height_km(&self) -> f64 {
        self.orbit_height_km
    }

    /// Returns latency (ms) of one hop through the relay: up to the orbit and back down, plus
    /// on-board processing.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::transport::Relay;
    ///
    /// let relay = Relay::default().with_orbit_height(0.0)?;
    /// assert!((relay.hop_latency_ms() - 5.0).abs() < 1e-12);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[must_use]
    pub fn hop_latency_ms(&self) -> f64 {
        2.0 * self.orbit_height_km / SPEED_OF_LIGHT_KM_PER_S * 1000.0 + PROCESSING_DELAY_MS
    }

    /// Returns the item if it survives the hop, or `None` if it is lost.
    ///
    /// # Examples
    ///
    /// ```
    /// use turbolink::transport::{Relay, TransportMessage};
    ///
    /// let message: TransportMessage = "receiver_host:localhost,receiver_port:9999,data:0110".parse()?;
    /// let relay = Relay::new(0.0)?;
    /// assert_eq!(relay.forward(message.clone(), &mut rand::rng()), Some(message));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn forward<T, R: Rng>(&self, item: T, rng: &mut R) -> Option<T> {
        if rng.random_bool(self.drop_probability) {
            tracing::warn!("item lost in relay");
            None
        } else {
            Some(item)
        }
    }
}

fn missing_key(key: &str) -> Error {
    Error::InvalidInput(format!("Message has no {key:?} field"))
}

#[cfg(test)]
mod tests_of_transport_message {
    use super::*;
    use Bit::{One, Zero};

    fn message_for_test() -> TransportMessage {
        TransportMessage {
            receiver_host: "127.0.0.1".to_string(),
            receiver_port: 9999,
            data: vec![Zero, One, One, Zero, One],
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            message_for_test().to_string(),
            "receiver_host:127.0.0.1,receiver_port:9999,data:01101"
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "receiver_host:127.0.0.1,receiver_port:9999,data:01101"
                .parse::<TransportMessage>()
                .unwrap(),
            message_for_test()
        );
        // Any key order, unknown keys ignored
        assert_eq!(
            "data:01101,seq:3,receiver_port:9999,receiver_host:127.0.0.1\n"
                .parse::<TransportMessage>()
                .unwrap(),
            message_for_test()
        );
        let message = message_for_test();
        assert_eq!(message.to_string().parse::<TransportMessage>().unwrap(), message);
    }

    #[test]
    fn test_from_str_errors() {
        let bad = |text: &str| text.parse::<TransportMessage>().unwrap_err();
        assert!(matches!(
            bad("receiver_host:h,receiver_port,data:01"),
            Error::InvalidInput(_)
        ));
        assert!(matches!(
            bad("receiver_host:h,receiver_port:70000,data:01"),
            Error::InvalidInput(_)
        ));
        assert!(matches!(
            bad("receiver_host:h,data:01"),
            Error::InvalidInput(_)
        ));
        assert!(matches!(
            bad("receiver_host:h,receiver_port:1,data:0121"),
            Error::NonBinaryInput { index: 2, .. }
        ));
    }
}

#[cfg(test)]
mod tests_of_relay {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_new() {
        assert!(Relay::new(-0.1).is_err());
        assert!(Relay::new(1.1).is_err());
        assert!(Relay::new(f64::NAN).is_err());
        assert_eq!(Relay::new(0.5).unwrap().drop_probability(), 0.5);
        assert_eq!(
            Relay::default().drop_probability(),
            DEFAULT_DROP_PROBABILITY
        );
        assert_eq!(
            Relay::new(0.5).unwrap().orbit_height_km(),
            GEOSTATIONARY_ORBIT_HEIGHT_KM
        );
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_with_orbit_height() {
        let relay = Relay::default();
        assert!(relay.with_orbit_height(-1.0).is_err());
        assert!(relay.with_orbit_height(f64::INFINITY).is_err());
        assert!(relay.with_orbit_height(f64::NAN).is_err());
        let relay = Relay::new(0.2).unwrap().with_orbit_height(550.0).unwrap();
        assert_eq!(relay.orbit_height_km(), 550.0);
        assert_eq!(relay.drop_probability(), 0.2);
    }

    #[test]
    fn test_hop_latency_ms() {
        // Geostationary: 2 x 35786 km at light speed, plus 5 ms on board
        assert!((Relay::default().hop_latency_ms() - 243.738_859).abs() < 1e-6);
        let relay = Relay::default().with_orbit_height(0.0).unwrap();
        assert!((relay.hop_latency_ms() - PROCESSING_DELAY_MS).abs() < 1e-12);
    }

    #[test]
    fn test_forward() {
        let mut rng = StdRng::seed_from_u64(3);
        let relay = Relay::new(0.0).unwrap();
        assert!((0 .. 100).all(|n| relay.forward(n, &mut rng) == Some(n)));
        let relay = Relay::new(1.0).unwrap();
        assert!((0 .. 100).all(|n| relay.forward(n, &mut rng).is_none()));
        let relay = Relay::new(0.25).unwrap();
        let num_lost = (0 .. 10000)
            .filter(|&n| relay.forward(n, &mut rng).is_none())
            .count();
        assert!(num_lost > 2250 && num_lost < 2750);
    }
}
