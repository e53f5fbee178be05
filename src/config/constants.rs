// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Well-known endpoints, programs and mints
//!
//! This module centralizes magic constants used throughout the crate so the
//! analyzers and the client agree on them.

/// Default upstream endpoints
pub mod endpoints {
    /// Solscan Pro API v2 base. The trailing slash matters for `Url::join`.
    pub const DEFAULT_API_BASE_URL: &str = "https://pro-api.solscan.io/v2.0/";

    /// Public Solana mainnet JSON-RPC endpoint
    pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
}

/// Well-known on-chain programs, by program id
pub mod programs {
    pub const SYSTEM: &str = "11111111111111111111111111111111";
    pub const TOKEN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    pub const TOKEN_2022: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
    pub const ASSOCIATED_TOKEN: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
    pub const JUPITER_V6: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";
    pub const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
    pub const RAYDIUM_CLMM: &str = "CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK";
    pub const ORCA_WHIRLPOOL: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";
    pub const METEORA_DLMM: &str = "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YSVaPwxo";
    pub const MARINADE: &str = "MarBmsSgKXdrN1egZf5sqe1TMai9K1rChYNDJgjq7aD";
    pub const PUMP_FUN: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

    /// Human-readable name of a known program
    pub fn name(program_id: &str) -> Option<&'static str> {
        let name = match program_id {
            SYSTEM => "System Program",
            TOKEN => "Token Program",
            TOKEN_2022 => "Token-2022 Program",
            ASSOCIATED_TOKEN => "Associated Token Account Program",
            JUPITER_V6 => "Jupiter Aggregator v6",
            RAYDIUM_AMM_V4 => "Raydium AMM v4",
            RAYDIUM_CLMM => "Raydium CLMM",
            ORCA_WHIRLPOOL => "Orca Whirlpool",
            METEORA_DLMM => "Meteora DLMM",
            MARINADE => "Marinade Finance",
            PUMP_FUN => "Pump.fun",
            _ => return None,
        };
        Some(name)
    }
}

/// Well-known token mints
pub mod mints {
    /// Wrapped SOL
    pub const WSOL: &str = "So11111111111111111111111111111111111111112";
    /// Native USDC
    pub const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    /// Native USDT
    pub const USDT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
    pub const MSOL: &str = "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So";
    pub const JITOSOL: &str = "J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn";
    pub const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
    pub const JUP: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";

    /// Decimals of native SOL (lamports)
    pub const SOL_DECIMALS: u32 = 9;

    /// Stablecoins priced at 1 USD by the static price table
    pub const STABLECOINS: &[&str] = &[USDC, USDT];

    /// Category of a special token, if the mint is one
    pub fn category(mint: &str) -> Option<SpecialTokenCategory> {
        let category = match mint {
            USDC | USDT => SpecialTokenCategory::Stablecoin,
            WSOL => SpecialTokenCategory::WrappedSol,
            MSOL | JITOSOL => SpecialTokenCategory::LiquidStaking,
            BONK | JUP => SpecialTokenCategory::Ecosystem,
            _ => return None,
        };
        Some(category)
    }

    /// Ticker of a special token
    pub fn symbol(mint: &str) -> Option<&'static str> {
        let symbol = match mint {
            WSOL => "wSOL",
            USDC => "USDC",
            USDT => "USDT",
            MSOL => "mSOL",
            JITOSOL => "JitoSOL",
            BONK => "BONK",
            JUP => "JUP",
            _ => return None,
        };
        Some(symbol)
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum SpecialTokenCategory {
        Stablecoin,
        WrappedSol,
        LiquidStaking,
        Ecosystem,
    }
}
