//! Shared test helpers for E2E and adversarial tests.

use std::sync::Arc;

use k256::ecdsa::SigningKey;

use reclaim_core::address::LegacyAddress;
use reclaim_core::constants::VERSION_DIAMOND;
use reclaim_core::derivation::PublicKeyPoint;
use reclaim_core::eth::EthAddress;
use reclaim_core::recovery::sign_message;
use reclaim_core::types::{Amount, Timestamp};
use reclaim_ledger::{
    ClaimLedger, ClaimRequest, ClaimSettings, LedgerConfig, LedgerService, ManualClock, MemoryTransfer,
};

/// Deployment time used by the scenario tests.
pub const DEPLOY: Timestamp = 1_700_000_000;

/// Message and signatures from a Bitcoin Core compatible wallet, all over the
/// same key. The key's compressed form hashes to [`KNOWN_BITCOIN_ADDRESS`].
pub const KNOWN_MESSAGE: &str = "0x70A830C7EffF19c9Dd81Db87107f5Ea5804cbb3F";
pub const KNOWN_BITCOIN_ADDRESS: &str = "1Q9G4T5rLaf4Rz39WpkwGVM7e2jMxD2yRj";
pub const KNOWN_SIGNATURES: [&str; 13] = [
    "IBHr8AT4TZrOQSohdQhZEJmv65ZYiPzHhkOxNaOpl1wKM/2FWpraeT8L9TaphHI1zt5bI3pkqxdWGcUoUw0/lTo=",
    "IA7ZY6Vi52XpL6BKiq74jeP7phdBJO5JqgsEUsmUDZZFNWnsC6X3kknADhJdXCTLcjAUI1bwn1IAVprv/krj7tQ=",
    "IJ42x26AH10GPhfnXdHMzj5KAmjekeaS4sA6uo2unlW+GLJqSSrVW03sYFIouW/oOE6v/uCl5z0jgmbLmOngSXI=",
    "Hw9HBbWTVJkMOqfqy2CscivlB/CzNR3sanGhguYSWtshv5VOjffwEopeES+UnsrLPvYFtgA1jQKWGAyR8lEE3AA=",
    "H1lPAFpDfLx6tSUyWSRmiYeuHbUaGzy2Lx+FhqXyQ+y/DIg3Ep8xGNyrn5hDDDt314UbPB9E5QpI75JoEU3ZUE4=",
    "H+FQO+Am4R+k8hzw9U5ImJLCtikbmr8hqVcGfpdjDMnvPIal7HMIINX8WYhQ1LzxiXKoSFDAnJbS9Q8rBAdtZag=",
    "IOzKhB75qO45TUaXcuHZhW+3fFhFhRHUJhYTK+Rqzlftov1FTt5PeC2p5+tpkF8sYemm5tclPppg4vSt5N0Pp6E=",
    "IE8itTa9jSnTCC2TwJAyFIk60wbXlz8wpN3htH3+Zb5uLH0QZd60IsouCkyIZem16z9DwscFjPeBWOSmYbH26D0=",
    "HzwB2jWF13IxdjadcNU/hEapqGBsIrvJIhHqyWx6t8lK5YM9Wg0A6AZ91wwChjAm55ESymyiciS0dxGI2Uakm88=",
    "IEgJZn56Gd0u5ZnUAXHcCkuBSIHrymvoqsZF8sGDvr0ZiY7yfKJ7RhR4+tWWmjTHHIxOfhv0Wa7FNz7yC8v3LUY=",
    "IIf+kRcuzsQPbR5bW2W1Kz9urfxmsM0MbGYGuhML1pKdS8JLdUEEVEY86KIN/famgcQw43La02LTg142GBlGwaE=",
    "IIdIJSBKUExSabzNhmOtOamrTEnLHQeHEMVPM5BBfvYlTEtG3FvWzIWiAUe0ET4LFLWRkO8e6/TboyqYIT1QxgM=",
    "HxqyFxgt2+wWQB0hi5vt2yW7+3Qly+Rf7gNQIF8Ui+Zbj5JCalRrCcrJn2680QJuRBbIA9uc68wWS2J00LENRR8=",
];

/// A Diamond wallet address that signed claims for several targets with an
/// empty claim prefix.
pub const DIAMOND_WALLET_ADDRESS: &str = "dDdaBZRTDiybXrPvYdvKdydjsnbG3kfd11";
pub const DIAMOND_WALLET_HASH160: &str = "0252d1cd51d552ffa940499da352da8c6ca9e06e";

/// `(target, signature)` pairs produced by [`DIAMOND_WALLET_ADDRESS`].
/// Signatures starting with `H` carry header 31 and split into a 31-byte R
/// and a 33-byte S.
pub const DIAMOND_WALLET_CLAIMS: [(&str, &str); 8] = [
    (
        "0xEb44B81852A2705701A59D454d1a33DA7a71E169",
        "IChOonnXj+Mq2aJcQF8cQ+ZUfF22DcNB0mdQAO9GxyObbVl5XJHniGHVkSRgZJZU3qIt7uLkmAtGJCuOByF/e6g=",
    ),
    (
        "0x996E342F23693B625A41761479cc74d133792D0A",
        "H03UKIim1lQx9v/igL3bjt1fXGZUAHFWyboPOu2Y9/DFHcNI8sFfUSzUPvXh8crUlXxAOQtk+WAzO+CPsDdt+I8=",
    ),
    (
        "0x3393C9F655C153B178978a2913844510b7EE40AE",
        "INU4te0lw1Tun2JCssY4xS3a8fkZEbdeW/U+f/2M5+T4aD6IKx/y7F1k4Rg7UBDsVGsEeLdR4uO7H2NyWmDphbc=",
    ),
    (
        "0x39f2f917011bfa62071293a7095735BD4a0044eD",
        "IF6PriDQe9UUnWWLsITGxpq8kmQC8FtkIPtszYCnLdCuTK7dNWe82va69/z03YFhOlB8KhU2Kp8yo0dW0z4/Kfs=",
    ),
    (
        "0x877ef6d8e6d89A0a338A5A991F0C281778C24B6D",
        "H6uJIAvm5nl+Ub7ybWjauowjndYj8zuDZhoeYwR+sl/4TP6GR09IR5MADq35UKQs/n3es94rVftPHh1eifHh0D4=",
    ),
    (
        "0x3db37B2f9a09a6136Ae4aed8402CeDe821FC27E3",
        "H02krz1YKQWbU8/b4q2JvI+e2Ai0rVM6HuiBWrdXJZq+N0HUfMv+cTYjoqcJg2aPYBV+Nwiv+jIhz5EHMvXaSqA=",
    ),
    (
        "0xE79C0B2cc688Ee037718A03be2359D12E81D231d",
        "H7l0Zy/XQko/lNSNAoU5kVuYeM3IoJZklHrml8zifgbJShHV5bezUPcCfmE/yXt0GUXXLaAyVwjZE6W9kwGBgk0=",
    ),
    (
        "0xe79D037E4520dbFB395BA38a5B70e9EfC6c40760",
        "IEzBr/rLqReoQh/LMNt0yH6m0MDxgQKsuZMq4wKqNyCaG6pJzPAQ5/Lfla/khvsfur/3l/1KhRiPi0VoqXp4Vqc=",
    ),
];

/// Deterministic secret from a seed byte (never zero).
pub fn secret(seed: u8) -> [u8; 32] {
    let mut s = [0x11u8; 32];
    s[31] = seed;
    s
}

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&secret(seed)).unwrap()
}

/// Diamond address of the compressed key for `seed`.
pub fn legacy_address(seed: u8) -> LegacyAddress {
    let key = signing_key(seed);
    PublicKeyPoint::from_public_key(&k256::PublicKey::from(key.verifying_key()))
        .to_legacy_address(VERSION_DIAMOND)
}

/// A recipient address distinct per seed.
pub fn target(seed: u8) -> EthAddress {
    let mut bytes = [0xE0u8; 20];
    bytes[19] = seed;
    EthAddress(bytes)
}

pub fn test_config() -> LedgerConfig {
    LedgerConfig {
        claim_prefix: "claim to ".into(),
        deployment_timestamp: DEPLOY,
        ..Default::default()
    }
}

pub fn test_ledger(config: &LedgerConfig) -> ClaimLedger<MemoryTransfer> {
    ClaimLedger::new(config, MemoryTransfer::new()).unwrap()
}

/// A service over a fresh ledger with a clock parked at deployment time.
pub fn test_service(config: &LedgerConfig) -> (LedgerService<MemoryTransfer>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(config.deployment_timestamp));
    let service = LedgerService::new(test_ledger(config), clock.clone());
    (service, clock)
}

/// A claim for `seed`'s address, signed by `signer`, paying `to`.
pub fn claim_signed_by(
    settings: &ClaimSettings,
    seed: u8,
    signer: u8,
    to: EthAddress,
    postfix: &str,
) -> ClaimRequest {
    let message = settings.message_for(&to, postfix);
    let sig = sign_message(&secret(signer), &message, settings.scheme).unwrap();
    ClaimRequest::new(legacy_address(seed), to, sig).with_postfix(postfix)
}

/// A correctly signed claim for `seed` paying `to`.
pub fn signed_claim(settings: &ClaimSettings, seed: u8, to: EthAddress) -> ClaimRequest {
    claim_signed_by(settings, seed, seed, to, "")
}

/// Fund one row per `(seed, amount)`.
pub fn fund_all(service: &LedgerService<MemoryTransfer>, rows: &[(u8, Amount)]) {
    for (seed, amount) in rows {
        service.fund(legacy_address(*seed).hash160(), *amount).unwrap();
    }
}
