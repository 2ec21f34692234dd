//! The finite set of contract reads the pipeline performs.
//!
//! Each call knows its target, its ABI encoding and its output schema, so a
//! batch response can be decoded without any runtime schema lookup.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::error::{WalletError, WalletResult};
use crate::rpc::types::CallRequest;

sol! {
    function balanceOf(address owner) external view returns (uint256);
    function decimals() external view returns (uint8);
    function getGasPriceMinimum(address tokenAddress) external view returns (uint256);
    function medianRate(address token) external view returns (uint256 numerator, uint256 denominator);
    function transfer(address to, uint256 value) external returns (bool);
}

/// A supported read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCall {
    /// ERC-20 `balanceOf(owner)` on `token`.
    BalanceOf { token: Address, owner: Address },
    /// ERC-20 `decimals()` on `token`.
    Decimals { token: Address },
    /// `getGasPriceMinimum(fee_currency)` on the gas price minimum contract.
    GasPriceMinimum { contract: Address, fee_currency: Address },
    /// `medianRate(token)` on the oracle; two outputs.
    ExchangeRate { oracle: Address, token: Address },
}

/// Decoded call output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    /// Single-output functions, unwrapped.
    Scalar(U256),
    /// Multi-output functions, in declaration order.
    Tuple(Vec<U256>),
}

impl CallOutput {
    pub fn as_scalar(&self) -> Option<U256> {
        match self {
            CallOutput::Scalar(v) => Some(*v),
            CallOutput::Tuple(_) => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[U256]> {
        match self {
            CallOutput::Scalar(_) => None,
            CallOutput::Tuple(values) => Some(values),
        }
    }

    /// Like [`CallOutput::as_scalar`] but an error when the shape is wrong.
    pub fn into_scalar(self) -> WalletResult<U256> {
        self.as_scalar()
            .ok_or_else(|| WalletError::Protocol("Expected a single output, got a tuple".into()))
    }
}

impl ReadCall {
    /// Contract the call is sent to.
    pub fn target(&self) -> Address {
        match self {
            ReadCall::BalanceOf { token, .. } => *token,
            ReadCall::Decimals { token } => *token,
            ReadCall::GasPriceMinimum { contract, .. } => *contract,
            ReadCall::ExchangeRate { oracle, .. } => *oracle,
        }
    }

    /// ABI-encoded call data.
    pub fn calldata(&self) -> Bytes {
        let encoded = match self {
            ReadCall::BalanceOf { owner, .. } => balanceOfCall { owner: *owner }.abi_encode(),
            ReadCall::Decimals { .. } => decimalsCall {}.abi_encode(),
            ReadCall::GasPriceMinimum { fee_currency, .. } => getGasPriceMinimumCall {
                tokenAddress: *fee_currency,
            }
            .abi_encode(),
            ReadCall::ExchangeRate { token, .. } => medianRateCall { token: *token }.abi_encode(),
        };
        Bytes::from(encoded)
    }

    /// `eth_call` object for this read.
    pub fn to_call_request(&self) -> CallRequest {
        CallRequest::read(self.target(), self.calldata())
    }

    /// Decode return data against this call's output schema.
    pub fn decode(&self, data: &[u8]) -> WalletResult<CallOutput> {
        let decode_err =
            |e: alloy::sol_types::Error| WalletError::Protocol(format!("{:?} returned undecodable data: {}", self, e));
        match self {
            ReadCall::BalanceOf { .. } => balanceOfCall::abi_decode_returns(data)
                .map(CallOutput::Scalar)
                .map_err(decode_err),
            ReadCall::Decimals { .. } => decimalsCall::abi_decode_returns(data)
                .map(|d| CallOutput::Scalar(U256::from(d)))
                .map_err(decode_err),
            ReadCall::GasPriceMinimum { .. } => getGasPriceMinimumCall::abi_decode_returns(data)
                .map(CallOutput::Scalar)
                .map_err(decode_err),
            ReadCall::ExchangeRate { .. } => medianRateCall::abi_decode_returns(data)
                .map(|r| CallOutput::Tuple(vec![r.numerator, r.denominator]))
                .map_err(decode_err),
        }
    }
}

/// Call data for an ERC-20 `transfer(to, value)`.
pub fn erc20_transfer_data(to: Address, value: U256) -> Bytes {
    Bytes::from(transferCall { to, value }.abi_encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolValue;

    #[test]
    fn test_balance_of_selector() {
        let call = ReadCall::BalanceOf {
            token: Address::repeat_byte(1),
            owner: Address::repeat_byte(2),
        };
        let data = call.calldata();
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(call.target(), Address::repeat_byte(1));
    }

    #[test]
    fn test_single_output_unwrapped() {
        let call = ReadCall::GasPriceMinimum {
            contract: Address::ZERO,
            fee_currency: Address::ZERO,
        };
        let encoded = U256::from(5_000_000_000u64).abi_encode();
        assert_eq!(
            call.decode(&encoded).unwrap(),
            CallOutput::Scalar(U256::from(5_000_000_000u64))
        );
    }

    #[test]
    fn test_multi_output_left_as_tuple() {
        let call = ReadCall::ExchangeRate {
            oracle: Address::ZERO,
            token: Address::ZERO,
        };
        let encoded = (U256::from(3), U256::from(4)).abi_encode_params();
        let output = call.decode(&encoded).unwrap();
        assert_eq!(output.as_tuple(), Some(&[U256::from(3), U256::from(4)][..]));
        assert!(output.into_scalar().is_err());
    }

    #[test]
    fn test_short_return_data_rejected() {
        let call = ReadCall::Decimals {
            token: Address::ZERO,
        };
        assert!(call.decode(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_transfer_selector() {
        let data = erc20_transfer_data(Address::ZERO, U256::from(1));
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    }
}
