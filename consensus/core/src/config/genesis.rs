use dagcore_hashes::Hash;

/// The genesis block of a network. Only the fields consumed by consensus processing are kept.
#[derive(Clone, Copy, Debug)]
pub struct GenesisBlock {
    pub hash: Hash,
    pub bits: u32,
}

pub const GENESIS: GenesisBlock = GenesisBlock {
    hash: Hash::from_bytes([
        0x58, 0xc2, 0xd4, 0x19, 0x9e, 0x21, 0xf9, 0x10, 0xd1, 0x57, 0x1d, 0x11, 0x49, 0x69, 0xce, 0xce, 0xf4, 0x8f, 0x09, 0xf9, 0x34,
        0xd4, 0x2c, 0xcb, 0x6a, 0x28, 0x1a, 0x15, 0x86, 0x8f, 0x29, 0x99,
    ]),
    bits: 0x1e7fffff,
};

pub const TESTNET_GENESIS: GenesisBlock = GenesisBlock {
    hash: Hash::from_bytes([
        0xf8, 0x96, 0xa3, 0x03, 0x48, 0x73, 0xbe, 0x17, 0x39, 0xfc, 0x43, 0x59, 0x23, 0x68, 0x99, 0xfd, 0x3d, 0x65, 0xd2, 0xbc, 0x94,
        0xf9, 0x78, 0x0d, 0xf0, 0xd0, 0xda, 0x3e, 0xb1, 0xcc, 0x43, 0x70,
    ]),
    bits: 0x1e21bc1c,
};

pub const SIMNET_GENESIS: GenesisBlock = GenesisBlock {
    hash: Hash::from_bytes([
        0x41, 0x1f, 0x8c, 0xd2, 0x6f, 0x3d, 0x41, 0x12, 0xdf, 0xb5, 0x28, 0x7d, 0x2e, 0x8e, 0x5c, 0x59, 0x18, 0x55, 0x2a, 0x73, 0x8a,
        0x3b, 0x19, 0x9e, 0x6b, 0x6d, 0xc8, 0x2b, 0x94, 0x50, 0x3a, 0xd1,
    ]),
    bits: 0x207fffff,
};

pub const DEVNET_GENESIS: GenesisBlock = GenesisBlock {
    hash: Hash::from_bytes([
        0xb3, 0x97, 0x2f, 0x33, 0x61, 0x1d, 0xa8, 0x4e, 0x23, 0x4e, 0x6c, 0xbd, 0x21, 0x7c, 0x69, 0xe6, 0x0c, 0x5d, 0x4c, 0x1e, 0x22,
        0xb4, 0x8e, 0x52, 0xab, 0x33, 0xea, 0x1d, 0xf4, 0x98, 0x17, 0x47,
    ]),
    bits: 0x1e21bc1c,
};
