//! Layered transmission codec.
//!
//! Turns a packet into the bit stream a radio actually puts on the air and
//! back. The pipeline has up to four stages, each optional except
//! serialization:
//!
//! ```text
//! packet ── serialize ── scramble ── FEC encode ── interleave ──> bits
//! packet <─ deserialize ─ descramble ─ FEC decode ─ deinterleave <─ bits
//! ```
//!
//! Which stages run is fixed when the [`Codec`] is built from its
//! [`CodecConfig`]; encode and decode then always apply the same stages in
//! mirrored order. The produced [`TransmissionBitModel`] records the exact
//! FEC code and bit counts so any receiver holding the model can decode
//! without out-of-band knowledge.

pub mod fec;
pub mod interleaver;
pub mod scrambler;
pub mod serializer;

use serde::Deserialize;

pub use fec::ConvCode;
pub use interleaver::BlockInterleaver;
pub use scrambler::Scrambler;

/// Packet-level view of a transmission: the payload and the rate it is
/// sent at.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketModel {
    pub payload: Vec<u8>,
    /// Air bit rate in bits per second.
    pub bit_rate: f64,
}

/// Bit-level view of a transmission after all encode stages.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionBitModel {
    /// Bits of the serialization header before coding.
    pub header_bit_length: usize,
    /// Bits of the payload before coding.
    pub payload_bit_length: usize,
    /// Air bit rate in bits per second.
    pub bit_rate: f64,
    /// The coded bits as they go on the air.
    pub bits: Vec<bool>,
    /// FEC code the bits were encoded with, if any.
    pub fec: Option<ConvCode>,
}

impl TransmissionBitModel {
    /// Airtime of the coded bits in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.bits.len() as f64 / self.bit_rate
    }
}

/// Codec pipeline configuration, typically read from the medium config
/// file. Absent stages are skipped entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodecConfig {
    pub scrambler: Option<Scrambler>,
    pub fec: Option<ConvCode>,
    pub interleaver: Option<BlockInterleaver>,
}

/// Symmetric encoder/decoder over the configured stages.
#[derive(Debug, Clone)]
pub struct Codec {
    scrambler: Option<Scrambler>,
    fec: Option<ConvCode>,
    interleaver: Option<BlockInterleaver>,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Codec { scrambler: config.scrambler, fec: config.fec, interleaver: config.interleaver }
    }

    /// Encode a packet into the bit model that gets transmitted.
    pub fn encode(&self, packet: &PacketModel) -> Result<TransmissionBitModel, CodecError> {
        let mut bits = serializer::serialize(&packet.payload)?;
        let payload_bit_length = bits.len() - serializer::HEADER_BITS;
        if let Some(scrambler) = &self.scrambler {
            bits = scrambler.scramble(&bits);
        }
        if let Some(fec) = &self.fec {
            bits = fec.encode(&bits);
        }
        if let Some(interleaver) = &self.interleaver {
            bits = interleaver.interleave(&bits);
        }
        Ok(TransmissionBitModel {
            header_bit_length: serializer::HEADER_BITS,
            payload_bit_length,
            bit_rate: packet.bit_rate,
            bits,
            fec: self.fec.clone(),
        })
    }

    /// Decode received bits back into a packet.
    ///
    /// `bits` are the bits as demodulated at the receiver; the `model` of
    /// the originating transmission supplies the FEC code and the data
    /// length the decoder needs. With FEC configured, flipped bits within
    /// the code's correction capability are repaired transparently.
    pub fn decode(
        &self,
        bits: &[bool],
        model: &TransmissionBitModel,
    ) -> Result<PacketModel, CodecError> {
        let mut bits = bits.to_vec();
        if let Some(interleaver) = &self.interleaver {
            bits = interleaver.deinterleave(&bits);
        }
        if let Some(fec) = &model.fec {
            let data_len = model.header_bit_length + model.payload_bit_length;
            bits = fec.decode(&bits, data_len);
        }
        if let Some(scrambler) = &self.scrambler {
            bits = scrambler.scramble(&bits);
        }
        let payload = serializer::deserialize(&bits)?;
        Ok(PacketModel { payload, bit_rate: model.bit_rate })
    }
}

/// Errors produced by the codec pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Payload longer than the 16-bit length header can describe.
    PayloadTooLarge { bytes: usize },
    /// Bit stream shorter than its header declares.
    TruncatedFrame { expected: usize, actual: usize },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::PayloadTooLarge { bytes } => {
                write!(f, "payload of {bytes} bytes exceeds the 16-bit length header")
            }
            CodecError::TruncatedFrame { expected, actual } => {
                write!(f, "truncated frame: header declares {expected} bits, got {actual}")
            }
        }
    }
}

impl std::error::Error for CodecError {}
