//! Автоматический выключатель для запросов к бэкенду.
//!
//! После серии подряд идущих сбоев транспорта выключатель размыкается и
//! запросы отклоняются сразу, пока не истечёт таймаут. Затем пропускается
//! один пробный запрос: успех замыкает цепь, сбой снова размыкает её.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::CircuitBreakerConfig;

/// Состояния "Автоматического выключателя".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// **Closed**: нормальный режим, запросы разрешены.
    Closed,
    /// **Open**: запросы временно запрещены после множественных сбоев.
    Open,
    /// **HalfOpen**: таймаут истёк, разрешён пробный запрос.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    /// Счетчик последовательных сбоев.
    failure_count: AtomicU32,
    /// В полуоткрытом состоянии уже выполняется пробный запрос.
    probe_in_flight: AtomicBool,
    /// Момент последнего сбоя для расчета таймаута.
    last_failure: Mutex<Option<Instant>>,
    failure_threshold: u32,
    timeout_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            probe_in_flight: AtomicBool::new(false),
            last_failure: Mutex::new(None),
            failure_threshold: failure_threshold.max(1),
            timeout_duration: timeout,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(
            config.failure_threshold,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    /// Проверяет, можно ли выполнить следующий запрос. В полуоткрытом
    /// состоянии пропускается ровно один запрос до его результата.
    pub fn can_execute(&self) -> bool {
        match self.get_state() {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => self.try_start_probe(),
            CircuitState::Open => {
                let elapsed = self
                    .last_failure
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .map(|at| at.elapsed());
                if matches!(elapsed, Some(elapsed) if elapsed < self.timeout_duration) {
                    return false;
                }

                let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                match *state {
                    CircuitState::Open => {
                        *state = CircuitState::HalfOpen;
                        self.probe_in_flight.store(true, Ordering::SeqCst);
                        info!("Circuit breaker transitioning to HalfOpen state");
                        true
                    }
                    CircuitState::HalfOpen => self.try_start_probe(),
                    CircuitState::Closed => true,
                }
            }
        }
    }

    fn try_start_probe(&self) -> bool {
        let started = self
            .probe_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if !started {
            debug!("Circuit breaker probe already in flight - rejecting request");
        }
        started
    }

    pub fn record_success(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state == CircuitState::HalfOpen {
            info!("Circuit breaker recovered - transitioning to Closed state");
        }
        if *state != CircuitState::Open {
            *state = CircuitState::Closed;
            self.failure_count.store(0, Ordering::Relaxed);
        }
        self.probe_in_flight.store(false, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        let failure_count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        match *state {
            CircuitState::Closed if failure_count >= self.failure_threshold => {
                *state = CircuitState::Open;
                error!(
                    "Circuit breaker OPENED - {} failures reached threshold {}",
                    failure_count, self.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                warn!("Circuit breaker probe failed - returning to Open state");
            }
            _ => {}
        }
        self.probe_in_flight.store(false, Ordering::SeqCst);
    }

    pub fn get_state(&self) -> CircuitState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.can_execute());
        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Open);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 1);
    }

    #[test]
    fn half_open_probe_decides_next_state() {
        let breaker = CircuitBreaker::new(1, Duration::ZERO);
        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Open);

        assert!(breaker.can_execute());
        assert_eq!(breaker.get_state(), CircuitState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.get_state(), CircuitState::Open);

        assert!(breaker.can_execute());
        breaker.record_success();
        assert_eq!(breaker.get_state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn half_open_admits_a_single_probe() {
        let breaker = CircuitBreaker::new(1, Duration::ZERO);
        breaker.record_failure();

        assert!(breaker.can_execute());
        assert!(!breaker.can_execute());
        assert!(!breaker.can_execute());
        assert_eq!(breaker.get_state(), CircuitState::HalfOpen);

        // Провал пробы снова размыкает цепь, после таймаута пускается новая проба
        breaker.record_failure();
        assert!(breaker.can_execute());
        assert!(!breaker.can_execute());

        breaker.record_success();
        assert_eq!(breaker.get_state(), CircuitState::Closed);
        assert!(breaker.can_execute());
        assert!(breaker.can_execute());
    }

    #[test]
    fn concurrent_callers_get_one_probe() {
        let breaker = std::sync::Arc::new(CircuitBreaker::new(1, Duration::ZERO));
        breaker.record_failure();

        let admitted: usize = (0..8)
            .map(|_| {
                let breaker = breaker.clone();
                std::thread::spawn(move || breaker.can_execute())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap() as usize)
            .sum();
        assert_eq!(admitted, 1);
    }
}
