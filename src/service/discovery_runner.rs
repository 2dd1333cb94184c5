//! 发现流程执行器
//!
//! 把控制器产出的命令交给外部协作方执行，并把结果回送控制器，
//! 直到没有后续命令。每个请求带超时，超时按连接/扫描失败处理。

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::chain_config::{Asset, Network};
use crate::domain::derivation_path::ExtendedDerivationPath;
use crate::error::{ConnectError, DiscoveryError, ScanError};
use crate::service::discovery_controller::DiscoverySessionController;
use crate::service::discovery_state::DiscoverySnapshot;
use crate::service::session::{AccountFetcher, DiscoveryCommand, WalletConnector};

pub struct DiscoveryRunner<W, F> {
    controller: DiscoverySessionController,
    connector: Arc<W>,
    fetcher: Arc<F>,
    scan_timeout: Duration,
}

impl<W, F> DiscoveryRunner<W, F>
where
    W: WalletConnector,
    F: AccountFetcher,
{
    pub fn new(
        controller: DiscoverySessionController,
        connector: Arc<W>,
        fetcher: Arc<F>,
        scan_timeout: Duration,
    ) -> Self {
        Self {
            controller,
            connector,
            fetcher,
            scan_timeout,
        }
    }

    pub fn controller(&self) -> &DiscoverySessionController {
        &self.controller
    }

    pub fn snapshot(&self) -> DiscoverySnapshot {
        self.controller.snapshot()
    }

    /// 连接并执行完整的发现流程
    pub async fn connect(
        &mut self,
        network: Network,
        asset: Asset,
    ) -> Result<DiscoverySnapshot, DiscoveryError> {
        let command = self.controller.request_connection(network, asset)?;
        self.drive(vec![command]).await?;
        Ok(self.snapshot())
    }

    pub async fn add_custom_paths(
        &mut self,
        paths: Vec<ExtendedDerivationPath>,
    ) -> Result<DiscoverySnapshot, DiscoveryError> {
        let commands = self.controller.add_custom_paths(paths)?;
        self.drive(commands).await?;
        Ok(self.snapshot())
    }

    pub async fn scan_more_addresses(
        &mut self,
        path: ExtendedDerivationPath,
    ) -> Result<DiscoverySnapshot, DiscoveryError> {
        let command = self.controller.scan_more_addresses(path)?;
        self.drive(vec![command]).await?;
        Ok(self.snapshot())
    }

    pub async fn update_asset(&mut self, asset: Asset) -> Result<DiscoverySnapshot, DiscoveryError> {
        let commands = self.controller.update_asset(asset)?;
        self.drive(commands).await?;
        Ok(self.snapshot())
    }

    /// 扫描失败后恢复
    pub async fn resume(&mut self) -> Result<DiscoverySnapshot, DiscoveryError> {
        let commands = self.controller.resume()?;
        self.drive(commands).await?;
        Ok(self.snapshot())
    }

    pub fn reset(&mut self) {
        self.controller.reset();
    }

    /// 依次执行命令，直到队列为空
    async fn drive(&mut self, commands: Vec<DiscoveryCommand>) -> Result<(), DiscoveryError> {
        let mut queue: VecDeque<DiscoveryCommand> = commands.into();
        let timeout_secs = self.scan_timeout.as_secs();

        while let Some(command) = queue.pop_front() {
            let ticket = command.ticket();
            let follow_up = match command {
                DiscoveryCommand::Connect(request) => {
                    let result =
                        match tokio::time::timeout(self.scan_timeout, self.connector.connect(&request))
                            .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(ConnectError::Timeout(timeout_secs)),
                        };
                    self.controller.on_connected(ticket, result)?
                }
                DiscoveryCommand::FetchAccounts(request) => {
                    let result = match tokio::time::timeout(
                        self.scan_timeout,
                        self.fetcher.fetch_accounts(&request),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ScanError::Timeout(timeout_secs)),
                    };
                    self.controller.on_accounts_scanned(ticket, result)?
                }
            };
            queue.extend(follow_up);
        }

        Ok(())
    }
}
