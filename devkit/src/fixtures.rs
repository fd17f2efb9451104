/*!
Captured `nvidia-smi -q -x` documents, trimmed to the fields GPUWatch reads
plus a few of the neighbours the parser has to skip over.
*/

/// Two GPUs, enumerated with the higher bus id first. GPU 0 runs three
/// processes holding 500, 3000 and 1000 MiB in that order.
pub const SMI_TWO_GPUS: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE nvidia_smi_log SYSTEM "nvsmi_device_v12.dtd">
<nvidia_smi_log>
	<timestamp>Wed May  1 12:00:00 2024</timestamp>
	<driver_version>535.104.05</driver_version>
	<cuda_version>12.2</cuda_version>
	<attached_gpus>2</attached_gpus>
	<gpu id="00000000:81:00.0">
		<product_name>NVIDIA A100-SXM4-80GB</product_name>
		<product_brand>NVIDIA</product_brand>
		<uuid>GPU-5d2f7c1e-0000-0000-0000-000000000001</uuid>
		<fb_memory_usage>
			<total>81920 MiB</total>
			<reserved>573 MiB</reserved>
			<used>40960 MiB</used>
			<free>40387 MiB</free>
		</fb_memory_usage>
		<bar1_memory_usage>
			<total>131072 MiB</total>
			<used>1 MiB</used>
			<free>131071 MiB</free>
		</bar1_memory_usage>
		<utilization>
			<gpu_util>87 %</gpu_util>
			<memory_util>41 %</memory_util>
			<encoder_util>0 %</encoder_util>
			<decoder_util>0 %</decoder_util>
		</utilization>
		<temperature>
			<gpu_temp>61 C</gpu_temp>
			<gpu_temp_max_threshold>92 C</gpu_temp_max_threshold>
			<memory_temp>70 C</memory_temp>
		</temperature>
		<gpu_power_readings>
			<power_state>P0</power_state>
			<average_power_draw>298.10 W</average_power_draw>
			<instant_power_draw>312.45 W</instant_power_draw>
			<current_power_limit>400.00 W</current_power_limit>
			<requested_power_limit>400.00 W</requested_power_limit>
			<default_power_limit>400.00 W</default_power_limit>
		</gpu_power_readings>
		<processes>
			<process_info>
				<gpu_instance_id>N/A</gpu_instance_id>
				<compute_instance_id>N/A</compute_instance_id>
				<pid>4101</pid>
				<type>C</type>
				<process_name>/opt/conda/bin/tritonserver</process_name>
				<used_memory>500 MiB</used_memory>
			</process_info>
			<process_info>
				<gpu_instance_id>N/A</gpu_instance_id>
				<compute_instance_id>N/A</compute_instance_id>
				<pid>4102</pid>
				<type>C</type>
				<process_name>/usr/bin/python3</process_name>
				<used_memory>3000 MiB</used_memory>
			</process_info>
			<process_info>
				<gpu_instance_id>N/A</gpu_instance_id>
				<compute_instance_id>N/A</compute_instance_id>
				<pid>4103</pid>
				<type>C</type>
				<process_name>/usr/bin/python3</process_name>
				<used_memory>1000 MiB</used_memory>
			</process_info>
		</processes>
	</gpu>
	<gpu id="00000000:01:00.0">
		<product_name>NVIDIA A100-SXM4-80GB</product_name>
		<fb_memory_usage>
			<total>81920 MiB</total>
			<reserved>573 MiB</reserved>
			<used>4 MiB</used>
			<free>81343 MiB</free>
		</fb_memory_usage>
		<utilization>
			<gpu_util>0 %</gpu_util>
			<memory_util>0 %</memory_util>
		</utilization>
		<temperature>
			<gpu_temp>34 C</gpu_temp>
		</temperature>
		<gpu_power_readings>
			<power_state>P0</power_state>
			<instant_power_draw>58.20 W</instant_power_draw>
			<current_power_limit>400.00 W</current_power_limit>
		</gpu_power_readings>
		<processes>
		</processes>
	</gpu>
</nvidia_smi_log>
"#;

/// A device with every magnitude unreadable.
pub const SMI_BAD_FIELDS: &str = r#"<?xml version="1.0" ?>
<nvidia_smi_log>
	<attached_gpus>1</attached_gpus>
	<gpu id="00000000:02:00.0">
		<product_name>Tesla T4</product_name>
		<fb_memory_usage>
			<total>lots</total>
			<used>N/A</used>
		</fb_memory_usage>
		<utilization>
			<gpu_util>N/A</gpu_util>
		</utilization>
		<temperature>
			<gpu_temp>warm</gpu_temp>
		</temperature>
		<gpu_power_readings>
			<instant_power_draw>[Not Supported]</instant_power_draw>
			<current_power_limit>70.00 W</current_power_limit>
		</gpu_power_readings>
		<processes>
			<process_info>
				<pid>not-a-pid</pid>
				<process_name>ghost</process_name>
				<used_memory>N/A</used_memory>
			</process_info>
		</processes>
	</gpu>
</nvidia_smi_log>
"#;

/// Older driver layout (`<power_readings>`), with a used reading above the total.
pub const SMI_LEGACY_POWER: &str = r#"<?xml version="1.0" ?>
<nvidia_smi_log>
	<driver_version>470.223.02</driver_version>
	<attached_gpus>1</attached_gpus>
	<gpu id="00000000:3B:00.0">
		<product_name>NVIDIA GeForce RTX 2080 Ti</product_name>
		<fb_memory_usage>
			<total>11264 MiB</total>
			<used>11300 MiB</used>
			<free>0 MiB</free>
		</fb_memory_usage>
		<utilization>
			<gpu_util>12 %</gpu_util>
		</utilization>
		<temperature>
			<gpu_temp>48 C</gpu_temp>
		</temperature>
		<power_readings>
			<power_management>Supported</power_management>
			<power_draw>68.12 W</power_draw>
			<power_limit>250.00 W</power_limit>
			<default_power_limit>250.00 W</default_power_limit>
			<enforced_power_limit>250.00 W</enforced_power_limit>
		</power_readings>
		<processes>
		</processes>
	</gpu>
</nvidia_smi_log>
"#;

/// A host with the driver loaded and no devices attached.
pub const SMI_NO_GPUS: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE nvidia_smi_log SYSTEM "nvsmi_device_v12.dtd">
<nvidia_smi_log>
	<driver_version>535.104.05</driver_version>
	<attached_gpus>0</attached_gpus>
</nvidia_smi_log>
"#;

/// Output cut off mid-device.
pub const SMI_TRUNCATED: &str = r#"<?xml version="1.0" ?>
<nvidia_smi_log>
	<attached_gpus>1</attached_gpus>
	<gpu id="00000000:01:00.0">
		<product_name>NVIDIA A100"#;
