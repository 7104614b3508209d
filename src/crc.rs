/// CRC-16/IBM-3740 as computed by the WD177x family
///
/// Polynomial 0x1021, initial value 0xFFFF, no reflection. Address marks are
/// included in the CRC, so an ID field CRC covers `A1 A1 A1 FE C H R N`.

const CRC_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Calculate the CRC of `data`, continuing from `start` if given
pub fn crc_ibm_3740(data: &[u8], start: Option<u16>) -> u16 {
    data.iter().fold(start.unwrap_or(0xFFFF), |crc, &byte| {
        (crc << 8) ^ CRC_TABLE[((crc >> 8) as u8 ^ byte) as usize]
    })
}
