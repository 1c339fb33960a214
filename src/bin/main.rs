//! Fractal CLI - JSON in, JSON out
//!
//!   fractal classify <address>
//!   fractal fee --inputs N --outputs M --type T --fee-rate R
//!   fractal balance <address>
//!   fractal send --from <address> --wif <wif> --to <address> --amount <sats>
//!   fractal inscribe --mnemonic <words> [--recipient <address>] (--text <text> | --json <json>)
//!
//! Configuration (environment or .env):
//!   FRACTAL_NETWORK       bitcoin | testnet   (--network overrides)
//!   FRACTAL_MEMPOOL_URL   chain-data base URL (--mempool overrides)
//!   RUST_LOG, FRACTAL_LOG_JSON
//!
//! Output: result JSON on stdout; `{"error": ...}` on stderr with exit code 1.

use std::env;
use std::io::IsTerminal;

use anyhow::{anyhow, bail, Context};
use fractal::logging::init_logging;
use fractal::{
    classify, confirmed_balance, estimate_fee, estimate_size, inscribe, send, AddressPair, AddressType,
    FractalConfig, Inscription, MempoolClient, Network,
};
use serde_json::{json, Value};
use tracing::debug;

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let opts = ParsedArgs::parse(&args[1..]);
    init_logging();

    if opts.help {
        print_usage();
        return;
    }
    if opts.version {
        println!("fractal {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("classify") => cmd_classify(&opts),
        Some("fee") => cmd_fee(&opts),
        Some("balance") => cmd_balance(&opts).await,
        Some("send") => cmd_send(&opts).await,
        Some("inscribe") => cmd_inscribe(&opts).await,
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || std::io::stdout().is_terminal();
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => {
            eprintln!("{}", render(&json!({ "error": format!("{:#}", e) }), pretty));
            std::process::exit(1);
        }
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    rendered.unwrap_or_else(|_| value.to_string())
}

#[derive(Default)]
struct ParsedArgs {
    command: Option<String>,
    positional: Vec<String>,
    // Chain options
    network: Option<String>,
    mempool_url: Option<String>,
    // Fee options
    inputs: Option<String>,
    outputs: Option<String>,
    address_type: Option<String>,
    fee_rate: Option<String>,
    // Send options
    from: Option<String>,
    wif: Option<String>,
    to: Option<String>,
    amount: Option<String>,
    // Inscribe options
    mnemonic: Option<String>,
    recipient: Option<String>,
    text: Option<String>,
    json: Option<String>,
    // Output options
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> Self {
        load_dotenv();

        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut i = 0;

        while i < args.len() {
            let arg = args[i].as_str();
            let slot = match arg {
                "--help" | "-h" => { opts.help = true; None }
                "--version" | "-V" => { opts.version = true; None }
                "--pretty" => { opts.pretty = true; None }
                "--network" | "-n" => Some(&mut opts.network),
                "--mempool" => Some(&mut opts.mempool_url),
                "--inputs" => Some(&mut opts.inputs),
                "--outputs" => Some(&mut opts.outputs),
                "--type" | "-t" => Some(&mut opts.address_type),
                "--fee-rate" => Some(&mut opts.fee_rate),
                "--from" => Some(&mut opts.from),
                "--wif" => Some(&mut opts.wif),
                "--to" => Some(&mut opts.to),
                "--amount" => Some(&mut opts.amount),
                "--mnemonic" | "-m" => Some(&mut opts.mnemonic),
                "--recipient" | "-r" => Some(&mut opts.recipient),
                "--text" => Some(&mut opts.text),
                "--json" => Some(&mut opts.json),
                _ => {
                    positional.push(args[i].clone());
                    None
                }
            };
            if let Some(slot) = slot {
                if i + 1 < args.len() {
                    *slot = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            i += 1;
        }

        let mut positional = positional.into_iter();
        opts.command = positional.next();
        opts.positional = positional.collect();
        opts
    }

    fn config(&self) -> anyhow::Result<FractalConfig> {
        let mut config = FractalConfig::from_env();
        if let Some(network) = &self.network {
            let network = Network::from_str(network).ok_or_else(|| anyhow!("unknown network: {}", network))?;
            let custom_url = env::var("FRACTAL_MEMPOOL_URL").ok().filter(|u| !u.trim().is_empty());
            config = FractalConfig::new(network);
            if let Some(url) = custom_url {
                config = config.with_mempool_url(url.trim());
            }
        }
        if let Some(url) = &self.mempool_url {
            config = config.with_mempool_url(url.as_str());
        }
        debug!(network = config.network.as_str(), mempool = %config.mempool_url, "config");
        Ok(config)
    }
}

fn load_dotenv() {
    let Ok(contents) = std::fs::read_to_string(".env") else { return };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"');
            if !value.is_empty() && env::var(key.trim()).is_err() {
                env::set_var(key.trim(), value);
            }
        }
    }
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> anyhow::Result<&'a str> {
    value.as_deref().ok_or_else(|| anyhow!("missing {}", flag))
}

fn parse_u64(value: &Option<String>, flag: &str) -> anyhow::Result<u64> {
    let raw = required(value, flag)?;
    raw.parse().with_context(|| format!("{} must be a non-negative integer, got {:?}", flag, raw))
}

fn first_positional<'a>(opts: &'a ParsedArgs, what: &str) -> anyhow::Result<&'a str> {
    opts.positional.first().map(String::as_str).ok_or_else(|| anyhow!("missing <{}>", what))
}

fn chain_client(config: &FractalConfig) -> anyhow::Result<MempoolClient> {
    MempoolClient::from_config(config).context("mempool client")
}

fn cmd_classify(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let address = first_positional(opts, "address")?;
    let config = opts.config()?;
    let ty = classify(address, config.network);
    Ok(json!({
        "address": address,
        "network": config.network.as_str(),
        "type": ty.map(|t| t.as_str()).unwrap_or("invalid"),
    }))
}

fn cmd_fee(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let inputs = parse_u64(&opts.inputs, "--inputs")? as usize;
    let outputs = parse_u64(&opts.outputs, "--outputs")? as usize;
    let fee_rate = parse_u64(&opts.fee_rate, "--fee-rate")?;
    let raw_type = required(&opts.address_type, "--type")?;
    let Some(ty) = AddressType::from_str(raw_type) else {
        bail!("unknown address type: {} (legacy, nested-segwit, native-segwit, taproot)", raw_type);
    };
    Ok(json!({
        "type": ty.as_str(),
        "size": estimate_size(inputs, outputs, ty),
        "fee": estimate_fee(inputs, outputs, ty, fee_rate),
        "feeRate": fee_rate,
    }))
}

async fn cmd_balance(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let address = first_positional(opts, "address")?;
    let config = opts.config()?;
    let chain = chain_client(&config)?;
    let confirmed = confirmed_balance(&chain, &config, address).await?;
    Ok(json!({ "address": address, "confirmed": confirmed }))
}

async fn cmd_send(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let from = AddressPair::new(required(&opts.from, "--from")?, required(&opts.wif, "--wif")?);
    let to = required(&opts.to, "--to")?;
    let amount = parse_u64(&opts.amount, "--amount")?;
    let config = opts.config()?;
    let chain = chain_client(&config)?;

    let receipt = send(&chain, &config, &from, to, amount).await?;
    Ok(serde_json::to_value(receipt)?)
}

async fn cmd_inscribe(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let mnemonic = required(&opts.mnemonic, "--mnemonic")?;
    let inscription = match (&opts.text, &opts.json) {
        (Some(text), None) => Inscription::text(text.as_str()),
        (None, Some(raw)) => {
            let value: Value = serde_json::from_str(raw).context("--json is not valid JSON")?;
            Inscription::json(&value)
        }
        _ => bail!("exactly one of --text or --json is required"),
    };
    let config = opts.config()?;
    let chain = chain_client(&config)?;

    match inscribe(&chain, &config, mnemonic, opts.recipient.as_deref(), &inscription).await {
        Ok(result) => Ok(serde_json::to_value(result)?),
        Err(e) => match e.commit_txid() {
            Some(commit_txid) => Err(anyhow!(e).context(format!("commit {} needs manual recovery", commit_txid))),
            None => Err(e.into()),
        },
    }
}

fn print_usage() {
    eprintln!(
        r#"fractal - UTXO transfers and inscriptions

USAGE:
    fractal <command> [options]

COMMANDS:
    classify <address>              Address type (legacy, nested-segwit, native-segwit, taproot, invalid)
    fee                             Estimate size and fee
        --inputs <n> --outputs <m> --type <type> --fee-rate <sat/vB>
    balance <address>               Confirmed balance in sats
    send                            Send sats, paying the fastest recommended fee rate
        --from <address> --wif <wif> --to <address> --amount <sats>
    inscribe                        Commit/reveal inscription from the mnemonic's BIP86 origin address
        --mnemonic <words> [--recipient <address>] (--text <text> | --json <json>)

OPTIONS:
    -n, --network <net>     bitcoin | testnet (default: $FRACTAL_NETWORK or bitcoin)
        --mempool <url>     Chain-data base URL (default: $FRACTAL_MEMPOOL_URL or network default)
        --pretty            Pretty-print JSON
    -h, --help              Show this help
    -V, --version           Show version

EXAMPLES:
    fractal classify bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4
    fractal fee --inputs 1 --outputs 2 --type native-segwit --fee-rate 5
    fractal -n testnet send --from tb1q... --wif c... --to tb1p... --amount 2000
    fractal inscribe --mnemonic "word1 ... word12" --text "gm"
"#
    );
}
