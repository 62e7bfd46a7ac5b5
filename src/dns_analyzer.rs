//! Basic DNS reconnaissance for a domain
//!
//! Lookups never fail the caller: NXDOMAIN, empty answers and timeouts all
//! come back as empty record lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::proto::rr::{Name, RecordType};
use trust_dns_resolver::TokioAsyncResolver;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsRecords {
    #[serde(rename = "A")]
    pub a: Vec<String>,
    #[serde(rename = "AAAA")]
    pub aaaa: Vec<String>,
    #[serde(rename = "MX")]
    pub mx: Vec<String>,
    #[serde(rename = "TXT")]
    pub txt: Vec<String>,
    #[serde(rename = "NS")]
    pub ns: Vec<String>,
    #[serde(rename = "CNAME")]
    pub cname: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSecurity {
    pub spf_configured: bool,
    pub dmarc_configured: bool,
    pub dkim_hints: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainAnalysis {
    pub domain: String,
    pub records: DnsRecords,
    pub security: DomainSecurity,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mail-security hints found in TXT records
pub fn check_security(txt_records: &[String]) -> DomainSecurity {
    let mut security = DomainSecurity::default();
    for txt in txt_records {
        let txt = txt.to_lowercase();
        if txt.contains("v=spf1") {
            security.spf_configured = true;
        }
        if txt.contains("v=dmarc1") {
            security.dmarc_configured = true;
        }
        if txt.contains("dkim") {
            security.dkim_hints = true;
        }
    }
    security
}

pub struct DnsAnalyzer {
    resolver: TokioAsyncResolver,
    lookup_timeout: Duration,
}

impl DnsAnalyzer {
    pub fn new(lookup_timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = lookup_timeout;

        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
            lookup_timeout,
        }
    }

    pub async fn analyze_domain(&self, domain: &str) -> DomainAnalysis {
        info!("🌐 Analyzing DNS for {}", domain);

        let mut analysis = DomainAnalysis {
            domain: domain.to_string(),
            records: DnsRecords::default(),
            security: DomainSecurity::default(),
            timestamp: Utc::now(),
            error: None,
        };

        if let Err(e) = Name::from_utf8(domain) {
            error!("DNS analysis failed for {}: {}", domain, e);
            analysis.error = Some(format!("Invalid domain name: {e}"));
            return analysis;
        }

        analysis.records = DnsRecords {
            a: self.records(domain, RecordType::A).await,
            aaaa: self.records(domain, RecordType::AAAA).await,
            mx: self.records(domain, RecordType::MX).await,
            txt: self.records(domain, RecordType::TXT).await,
            ns: self.records(domain, RecordType::NS).await,
            cname: self.records(domain, RecordType::CNAME).await,
        };
        analysis.security = check_security(&analysis.records.txt);

        analysis
    }

    async fn records(&self, domain: &str, record_type: RecordType) -> Vec<String> {
        match timeout(self.lookup_timeout, self.resolver.lookup(domain, record_type)).await {
            Ok(Ok(lookup)) => lookup
                .record_iter()
                .filter(|record| record.record_type() == record_type)
                .filter_map(|record| record.data())
                .map(|data| data.to_string())
                .collect(),
            Ok(Err(e)) => {
                debug!("DNS lookup failed for {} ({}): {}", domain, record_type, e);
                Vec::new()
            }
            Err(_) => {
                debug!("DNS lookup timed out for {} ({})", domain, record_type);
                Vec::new()
            }
        }
    }
}

impl Default for DnsAnalyzer {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
