/// CRC-8 properties.
pub mod crc;
