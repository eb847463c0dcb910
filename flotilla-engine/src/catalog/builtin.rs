//! The built-in benchmark defaults.

/// A built-in entry: name, description, default specification (as YAML), and
/// the allowed values of any restricted flags.
pub type BuiltinEntry = (
    &'static str,
    &'static str,
    &'static str,
    &'static [(&'static str, &'static [&'static str])],
);

/// The default specification of the `iperf` benchmark.
const IPERF: &str = r#"
vm_groups:
  vm_1: &single_core
    cloud: GCP
    vm_spec:
      GCP:
        machine_type: n1-standard-1
        zone: us-central1-a
      AWS:
        machine_type: t2.small
        zone: us-east-1a
      Azure:
        machine_type: Standard_A1
        zone: eastus
  vm_2: *single_core
flags:
  iperf_sending_thread_count: 1
  iperf_runtime_in_seconds: 60
"#;

/// The default specification of the `ping` benchmark.
const PING: &str = r#"
vm_groups:
  vm_1: &single_core
    cloud: GCP
    vm_spec:
      GCP:
        machine_type: n1-standard-1
        zone: us-central1-a
      AWS:
        machine_type: t2.small
        zone: us-east-1a
  vm_2: *single_core
"#;

/// The default specification of the `fio` benchmark.
const FIO: &str = r#"
vm_groups:
  default:
    cloud: GCP
    vm_spec:
      GCP:
        machine_type: n1-standard-4
        zone: us-central1-a
      AWS:
        machine_type: m4.xlarge
        zone: us-east-1a
    disk_specs:
      - mount_point: /scratch
        disk_size: 100
flags:
  fio_io_depths: 1
  fio_runtime: 600
"#;

/// The default specification of the `mysql_service` benchmark.
const MYSQL_SERVICE: &str = r#"
vm_groups:
  default:
    cloud: GCP
    vm_spec:
      GCP:
        machine_type: n1-standard-4
        zone: us-central1-c
      AWS:
        machine_type: m4.xlarge
        zone: us-west-1a
flags:
  db_instance_cores: 8
  oltp_tables_count: 4
  oltp_table_size: 100000
  sysbench_warmup_seconds: 120
  sysbench_run_seconds: 480
  sysbench_thread_count: 16
  sysbench_latency_percentile: 99
  sysbench_report_interval: 2
"#;

/// Every built-in benchmark.
pub const ENTRIES: &[BuiltinEntry] = &[
    ("iperf", "Run iperf between two VMs.", IPERF, &[]),
    ("ping", "Measure round-trip latency between two VMs.", PING, &[]),
    ("fio", "Run fio against a scratch disk.", FIO, &[]),
    (
        "mysql_service",
        "MySQL service benchmarks.",
        MYSQL_SERVICE,
        &[("db_instance_cores", &["1", "4", "8", "16"])],
    ),
];
