//! ERC-20 call encoding.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

sol! {
    /// The subset of the ERC-20 interface the faucet calls.
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// `keccak256("transfer(address,uint256)")[..4]`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Length of an encoded `transfer` call: selector + two 32-byte words.
pub const TRANSFER_CALL_LEN: usize = 4 + 32 + 32;

const WORD: usize = 32;
const ADDRESS_LEN: usize = 20;

/// Left-pad `input` with zero bytes to a 32-byte word.
fn left_pad(input: &[u8]) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - input.len()..].copy_from_slice(input);
    word
}

/// Encode `transfer(to, amount)` call data.
pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    let mut data = Vec::with_capacity(TRANSFER_CALL_LEN);
    data.extend_from_slice(&TRANSFER_SELECTOR);
    data.extend_from_slice(&left_pad(to.as_slice()));
    data.extend_from_slice(&amount.to_be_bytes::<WORD>());
    Bytes::from(data)
}

/// Encode `transfer` from a raw address slice, which must be exactly 20 bytes.
pub fn encode_transfer_from_slice(to: &[u8], amount: U256) -> BlockchainResult<Bytes> {
    if to.len() != ADDRESS_LEN {
        return Err(BlockchainError::InvalidInput(format!(
            "address must be {} bytes, got {}",
            ADDRESS_LEN,
            to.len()
        )));
    }
    Ok(encode_transfer(Address::from_slice(to), amount))
}
