//! reclaim-cli: operator tools for legacy balance claims.
//!
//! Recovers and derives keys and addresses from legacy signed messages,
//! checks claims offline, signs test fixtures, and inspects balance snapshots
//! and the dilution schedule.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use zeroize::Zeroizing;

use reclaim_core::address::LegacyAddress;
use reclaim_core::codec::hex_to_bytes;
use reclaim_core::constants::{VERSION_BITCOIN, VERSION_DIAMOND};
use reclaim_core::derivation::PublicKeyPoint;
use reclaim_core::eth::{EthAddress, address_checksum};
use reclaim_core::message::{SigningScheme, build_envelope, magic_hash};
use reclaim_core::recovery::{public_key_of, recover_public_key, sign_message};
use reclaim_core::traits::Clock;
use reclaim_dilution::DilutionStage;
use reclaim_ledger::{BalanceSnapshot, ClaimRequest, ClaimSettings, LedgerConfig, SystemClock, verify_claim};

/// Legacy balance claim tooling.
#[derive(Parser)]
#[command(name = "reclaim-cli")]
#[command(version, about = "Claim legacy balances by signed message.")]
struct Cli {
    /// Configuration file (default: <config dir>/reclaim/reclaim.toml if present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover the signer of a message.
    Recover(RecoverArgs),
    /// Derive addresses from a public key.
    Derive(DeriveArgs),
    /// Print the mixed-case checksum form of an Ethereum-style address.
    Checksum {
        address: String,
    },
    /// Print the signed-message envelope and its digest.
    Envelope(EnvelopeArgs),
    /// Print the HASH160 payload of a legacy address.
    Ripe {
        address: String,
    },
    /// Check a claim signature against a legacy address without a ledger.
    VerifyClaim(VerifyClaimArgs),
    /// Summarize a balance snapshot file.
    Snapshot(SnapshotArgs),
    /// Show the dilution thresholds and time remaining.
    Schedule,
    /// Sign a message with a raw secret key.
    Sign(SignArgs),
}

#[derive(Args)]
struct RecoverArgs {
    /// Base64 recoverable signature.
    #[arg(short, long)]
    signature: String,

    /// The signed text.
    #[arg(short, long)]
    message: String,

    /// diamond or bitcoin (default: from config).
    #[arg(long)]
    scheme: Option<SigningScheme>,
}

#[derive(Args)]
struct DeriveArgs {
    /// SEC1 public key hex, compressed or uncompressed.
    #[arg(long, conflicts_with_all = ["x", "y"])]
    pubkey: Option<String>,

    /// Affine x coordinate hex.
    #[arg(long, requires = "y")]
    x: Option<String>,

    /// Affine y coordinate hex.
    #[arg(long, requires = "x")]
    y: Option<String>,
}

#[derive(Args)]
struct EnvelopeArgs {
    /// Raw message. Mutually exclusive with --target.
    #[arg(short, long, conflicts_with = "target")]
    message: Option<String>,

    /// Build the claim message for this target address instead.
    #[arg(short, long)]
    target: Option<String>,

    /// Text appended after the target in a claim message.
    #[arg(long, default_value = "")]
    postfix: String,

    #[arg(long)]
    scheme: Option<SigningScheme>,
}

#[derive(Args)]
struct VerifyClaimArgs {
    /// Legacy address holding the balance.
    #[arg(short, long)]
    address: String,

    /// Target address the claim pays to.
    #[arg(short, long)]
    target: String,

    #[arg(short, long)]
    signature: String,

    #[arg(long, default_value = "")]
    postfix: String,

    #[arg(long)]
    scheme: Option<SigningScheme>,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Snapshot JSON file.
    path: PathBuf,

    /// Dust threshold in base units (default: from config).
    #[arg(long)]
    min_value: Option<u128>,
}

#[derive(Args)]
struct SignArgs {
    #[arg(short, long)]
    message: String,

    #[arg(long)]
    scheme: Option<SigningScheme>,

    /// Hex secret key. If not provided, will prompt securely.
    #[arg(long)]
    secret: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Recover(args) => recover(&config, args),
        Commands::Derive(args) => derive(&config, args),
        Commands::Checksum { address } => {
            println!("{}", address_checksum(&address).context("Invalid address")?);
            Ok(())
        }
        Commands::Envelope(args) => envelope(&config, args),
        Commands::Ripe { address } => ripe(&address),
        Commands::VerifyClaim(args) => verify(&config, args),
        Commands::Snapshot(args) => snapshot(&config, args),
        Commands::Schedule => schedule(&config),
        Commands::Sign(args) => sign(&config, args),
    }
}

/// Recover the public key and print every address form.
fn recover(config: &LedgerConfig, args: RecoverArgs) -> Result<()> {
    let scheme = args.scheme.unwrap_or(config.signing_scheme);
    let key = recover_public_key(&args.signature, &args.message, scheme)
        .context("Failed to recover public key")?;

    println!("public key:  {}", key.public_key_hex());
    println!("x:           {}", key.x());
    println!("y:           {}", key.y());
    print_addresses(config, &key.point);
    Ok(())
}

fn derive(config: &LedgerConfig, args: DeriveArgs) -> Result<()> {
    let point = match (args.pubkey, args.x, args.y) {
        (Some(pubkey), _, _) => {
            let bytes = hex_to_bytes(&pubkey).context("Public key is not hex")?;
            PublicKeyPoint::from_sec1(&bytes).context("Invalid public key")?
        }
        (None, Some(x), Some(y)) => PublicKeyPoint::from_hex(&x, &y).context("Invalid coordinates")?,
        _ => bail!("Provide --pubkey or both --x and --y"),
    };

    println!("compressed:  0x{}", hex::encode(point.compress()));
    print_addresses(config, &point);
    Ok(())
}

fn print_addresses(config: &LedgerConfig, point: &PublicKeyPoint) {
    println!("hash160:     {}", point.hash160());
    println!("legacy:      {}", point.to_legacy_address(config.legacy_version));
    if config.legacy_version != VERSION_DIAMOND {
        println!("diamond:     {}", point.to_legacy_address(VERSION_DIAMOND));
    }
    println!("bitcoin:     {}", point.to_legacy_address(VERSION_BITCOIN));
    println!("eth:         {}", point.to_eth_address());
}

fn envelope(config: &LedgerConfig, args: EnvelopeArgs) -> Result<()> {
    let scheme = args.scheme.unwrap_or(config.signing_scheme);
    let message = match (args.message, args.target) {
        (Some(message), None) => message,
        (None, Some(target)) => {
            let target = EthAddress::parse(&target).context("Invalid target address")?;
            ClaimSettings::from_config(config).message_for(&target, &args.postfix)
        }
        _ => bail!("Provide exactly one of --message or --target"),
    };

    println!("message:     {message}");
    println!("envelope:    0x{}", hex::encode(build_envelope(scheme.prefix(), &message)));
    println!("digest:      0x{}", hex::encode(magic_hash(&message, scheme)));
    Ok(())
}

fn ripe(address: &str) -> Result<()> {
    let address = LegacyAddress::decode(address.trim()).context("Invalid legacy address")?;
    println!("version:     {:#04x}", address.version());
    println!("hash160:     {}", address.hash160());
    Ok(())
}

fn verify(config: &LedgerConfig, args: VerifyClaimArgs) -> Result<()> {
    let address = LegacyAddress::decode(args.address.trim()).context("Invalid legacy address")?;
    let target = EthAddress::parse(&args.target).context("Invalid target address")?;
    let mut request = ClaimRequest::new(address, target, args.signature).with_postfix(args.postfix);
    request.scheme = args.scheme;

    let settings = ClaimSettings::from_config(config);
    println!("message:     {}", settings.message_for(&target, &request.postfix));
    let point = verify_claim(&settings, &request).context("Claim does not verify")?;
    println!("match:       {}", point.to_legacy_address(config.legacy_version));
    println!("public key:  0x{}", hex::encode(point.compress()));
    Ok(())
}

fn snapshot(config: &LedgerConfig, args: SnapshotArgs) -> Result<()> {
    let snapshot = BalanceSnapshot::load(&args.path)
        .with_context(|| format!("Failed to load snapshot: {}", args.path.display()))?;
    let summary = snapshot.summarize(args.min_value.unwrap_or(config.min_snapshot_value));

    if let Some(block) = snapshot.block {
        println!("block:       {block}");
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to render summary")?
    );
    Ok(())
}

/// Print each threshold with the seconds remaining until it.
fn schedule(config: &LedgerConfig) -> Result<()> {
    let schedule = config.schedule().context("Invalid dilution schedule")?;
    let now = SystemClock.now();

    for stage in [DilutionStage::Stage1, DilutionStage::Stage2, DilutionStage::Stage3] {
        let Some(at) = schedule.threshold(stage) else { continue };
        let when = i64::try_from(at)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "out of range".to_string());
        println!(
            "{stage}: {at} ({when}), {} s remaining",
            schedule.seconds_until(stage, now)
        );
    }
    Ok(())
}

fn sign(config: &LedgerConfig, args: SignArgs) -> Result<()> {
    let scheme = args.scheme.unwrap_or(config.signing_scheme);
    let secret_hex = match args.secret {
        Some(s) => Zeroizing::new(s),
        None => Zeroizing::new(prompt_password("Secret key (hex)")?),
    };

    let mut secret = Zeroizing::new([0u8; 32]);
    let digits = secret_hex.trim();
    let digits = digits.strip_prefix("0x").unwrap_or(digits);
    hex::decode_to_slice(digits, secret.as_mut_slice()).context("Secret key must be 32 bytes of hex")?;

    let signature = sign_message(&secret, &args.message, scheme).context("Failed to sign")?;
    let point = public_key_of(&secret).context("Invalid secret key")?;

    println!("signature:   {signature}");
    println!("legacy:      {}", point.to_legacy_address(config.legacy_version));
    Ok(())
}

/// Load configuration from `path`, or from the default location when it exists.
fn load_config(path: Option<&Path>) -> Result<LedgerConfig> {
    let default_path = default_config_path();
    let path = match path {
        Some(p) => Some(p),
        None => default_path.as_deref().filter(|p| p.exists()),
    };
    debug!(path = ?path, "loading configuration");
    LedgerConfig::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load config: {}", p.display()),
        None => "Failed to load config from environment".to_string(),
    })
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reclaim").join("reclaim.toml"))
}

fn prompt_password(prompt: &str) -> Result<String> {
    rpassword::prompt_password(format!("{}: ", prompt)).context("Failed to read input")
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// `RUST_LOG` overrides `level_str` when set.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_scheme_values() {
        let cli = Cli::try_parse_from([
            "reclaim-cli",
            "recover",
            "--signature",
            "AAAA",
            "--message",
            "m",
            "--scheme",
            "bitcoin",
        ])
        .unwrap();
        match cli.command {
            Commands::Recover(args) => assert_eq!(args.scheme, Some(SigningScheme::Bitcoin)),
            _ => panic!("expected recover"),
        }
    }

    #[test]
    fn derive_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["reclaim-cli", "derive", "--x", "01"]).is_err());
    }

    #[test]
    fn ripe_of_known_address() {
        assert!(ripe("dDdaBZRTDiybXrPvYdvKdydjsnbG3kfd11").is_ok());
        assert!(ripe("not-an-address").is_err());
    }
}
