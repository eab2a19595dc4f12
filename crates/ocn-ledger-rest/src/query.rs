use async_trait::async_trait;
use ocn_ledger::{Address, Amount, ChainParams, LedgerError, LedgerReader, Role, TopicId};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{truncate, RestLedger};

#[derive(Debug, Deserialize)]
struct RegisteredResponse {
    is_registered: bool,
}

#[derive(Debug, Deserialize)]
struct ParamsResponse {
    params: ParamsBody,
}

#[derive(Debug, Deserialize)]
struct ParamsBody {
    registration_fee: Amount,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: Coin,
}

#[derive(Debug, Deserialize)]
struct Coin {
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct StakeResponse {
    amount: Amount,
}

impl RestLedger {
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, &str)],
    ) -> Result<T, LedgerError> {
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("GET {url}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| LedgerError::Transport(format!("GET {url}: body read failed: {e}")))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LedgerError::NotFound(url));
        }
        if !status.is_success() {
            return Err(LedgerError::Api {
                status: Some(status.as_u16()),
                message: truncate(&body, 256),
            });
        }

        serde_json::from_str(&body).map_err(|e| LedgerError::Decode(format!("GET {url}: {e}")))
    }
}

#[async_trait]
impl LedgerReader for RestLedger {
    async fn is_registered(
        &self,
        topic_id: TopicId,
        role: Role,
        address: &Address,
    ) -> Result<bool, LedgerError> {
        let kind = match role {
            Role::Worker => "worker_registered",
            Role::Reputer => "reputer_registered",
        };
        let url = self.emissions_url(&format!("/{kind}/{topic_id}/{address}"));
        let r: RegisteredResponse = self.get_json(url, &[]).await?;
        Ok(r.is_registered)
    }

    async fn chain_params(&self) -> Result<ChainParams, LedgerError> {
        let r: ParamsResponse = self.get_json(self.emissions_url("/params"), &[]).await?;
        Ok(ChainParams {
            registration_fee: r.params.registration_fee,
        })
    }

    async fn balance(&self, address: &Address) -> Result<Amount, LedgerError> {
        let url = self.rest_url(&format!("/cosmos/bank/v1beta1/balances/{address}/by_denom"));
        let r: BalanceResponse = self
            .get_json(url, &[("denom", self.cfg.denom.as_str())])
            .await?;
        Ok(r.balance.amount)
    }

    async fn stake(&self, topic_id: TopicId, address: &Address) -> Result<Amount, LedgerError> {
        let url = self.emissions_url(&format!("/reputer_stake/{address}/{topic_id}"));
        let r: StakeResponse = self.get_json(url, &[]).await?;
        Ok(r.amount)
    }
}
